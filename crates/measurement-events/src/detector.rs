//! Threshold interval detection.
//!
//! For every threshold the detector keeps one open interval (the current
//! run of samples reaching the threshold) and a queue of closed intervals
//! waiting to be published. Queues are only published when the signal
//! crosses back to or past zero, so every interval belonging to one
//! excursion comes out together, outer threshold first.
//!
//! ```text
//!   level   0  1  1  0     0  2  2  1  1 -2
//!   time    1  2  4  5    10 12 17 18 24 25
//!                    │                    │
//!                    └► 2,4,1             └► 12,24,1
//!                                            12,17,2
//! ```

use std::fmt;

use crate::sample::{Level, Sample};
use crate::threshold::Threshold;

/// Header line written before the first record unless disabled.
pub const HEADER: &str = "Start Time,End Time,Level";

/// Queues grown past this are shrunk back after publishing.
const PENDING_RETAIN: usize = 8;

/// A closed interval during which the signal reached `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRecord {
    pub start: i64,
    pub end: i64,
    pub threshold: Threshold,
}

impl fmt::Display for IntervalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.start, self.end, self.threshold)
    }
}

/// The currently open interval of one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenInterval {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Default)]
struct ThresholdState {
    open: Option<OpenInterval>,
    pending: Vec<IntervalRecord>,
}

impl ThresholdState {
    fn extend(&mut self, time: i64) {
        match &mut self.open {
            Some(open) => open.end = time,
            None => self.open = Some(OpenInterval { start: time, end: time }),
        }
    }

    fn close(&mut self, threshold: Threshold) {
        if let Some(open) = self.open.take() {
            self.pending.push(IntervalRecord {
                start: open.start,
                end: open.end,
                threshold,
            });
        }
    }

    fn publish(&mut self, out: &mut Vec<IntervalRecord>) {
        if self.pending.is_empty() {
            return;
        }
        out.append(&mut self.pending);
        if self.pending.capacity() > PENDING_RETAIN {
            self.pending.shrink_to(PENDING_RETAIN);
        }
    }
}

/// Single-pass detector over a stream of samples.
#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    states: [ThresholdState; Threshold::COUNT],
    last_level: Level,
}

impl EventDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample, appending any published records to `out`.
    ///
    /// Records are appended in publication order: for a flush on the
    /// positive side every level `1` record precedes every level `2`
    /// record, and symmetrically on the negative side.
    pub fn process(&mut self, sample: Sample, out: &mut Vec<IntervalRecord>) {
        let level = sample.level;

        for threshold in Threshold::reached_by(level) {
            self.state_mut(threshold).extend(sample.time);
        }

        if level == self.last_level {
            return;
        }

        let last = self.last_level;
        if last.is_positive() && !level.is_positive() {
            self.close_and_publish(&Threshold::POSITIVE, out);
        } else if last.is_negative() && !level.is_negative() {
            self.close_and_publish(&Threshold::NEGATIVE, out);
        } else if let Some(extreme) = Threshold::extreme(last) {
            // Retreated from ±2 without leaving the side of zero.
            self.state_mut(extreme).close(extreme);
        }

        self.last_level = level;
    }

    /// Feed one sample and return whatever it published.
    pub fn observe(&mut self, sample: Sample) -> Vec<IntervalRecord> {
        let mut out = Vec::new();
        self.process(sample, &mut out);
        out
    }

    /// Return to the state of a freshly constructed detector.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.open = None;
            state.pending.clear();
        }
        self.last_level = Level::ZERO;
    }

    pub fn last_level(&self) -> Level {
        self.last_level
    }

    pub fn open_interval(&self, threshold: Threshold) -> Option<OpenInterval> {
        self.states[threshold.slot()].open
    }

    /// Closed intervals not yet published, oldest first.
    pub fn pending(&self, threshold: Threshold) -> &[IntervalRecord] {
        &self.states[threshold.slot()].pending
    }

    fn close_and_publish(&mut self, side: &[Threshold], out: &mut Vec<IntervalRecord>) {
        for &threshold in side {
            let state = self.state_mut(threshold);
            state.close(threshold);
            state.publish(out);
        }
    }

    fn state_mut(&mut self, threshold: Threshold) -> &mut ThresholdState {
        &mut self.states[threshold.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: i64, level: i64) -> Sample {
        Sample::new(time, Level::new(level).unwrap())
    }

    fn feed(detector: &mut EventDetector, samples: &[(i64, i64)]) -> Vec<String> {
        let mut out = Vec::new();
        for &(t, v) in samples {
            detector.process(sample(t, v), &mut out);
        }
        out.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn simple_positive_excursion() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(1, 0), (2, 1), (4, 1), (5, 0)]);
        assert_eq!(out, vec!["2,4,1"]);
    }

    #[test]
    fn nested_excursion_flushes_outer_first() {
        let mut d = EventDetector::new();
        let before = feed(&mut d, &[(10, 0), (12, 2), (17, 2), (18, 1), (24, 1)]);
        assert!(before.is_empty());
        assert_eq!(d.pending(Threshold::PosTwo).len(), 1);

        let out = feed(&mut d, &[(25, -2)]);
        assert_eq!(out, vec!["12,24,1", "12,17,2"]);
        assert_eq!(
            d.open_interval(Threshold::NegTwo),
            Some(OpenInterval { start: 25, end: 25 })
        );
        assert_eq!(
            d.open_interval(Threshold::NegOne),
            Some(OpenInterval { start: 25, end: 25 })
        );
    }

    #[test]
    fn repeated_returns_to_extreme_queue_several_records() {
        let mut d = EventDetector::new();
        let out = feed(
            &mut d,
            &[(30, 1), (32, 2), (33, 2), (34, 1), (36, 1), (37, 2), (38, 2), (40, 0)],
        );
        assert_eq!(out, vec!["30,38,1", "32,33,2", "37,38,2"]);
    }

    #[test]
    fn negative_side_mirrors_positive() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(25, -2), (26, -1), (28, -1), (29, 0)]);
        assert_eq!(out, vec!["25,28,-1", "25,25,-2"]);
    }

    #[test]
    fn crossing_straight_through_zero_flushes_old_side() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(1, -1), (2, -1), (3, 1)]);
        assert_eq!(out, vec!["1,2,-1"]);
        assert_eq!(
            d.open_interval(Threshold::PosOne),
            Some(OpenInterval { start: 3, end: 3 })
        );
    }

    #[test]
    fn single_sample_interval_is_recorded() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(7, 2), (8, 0)]);
        assert_eq!(out, vec!["7,7,1", "7,7,2"]);
    }

    #[test]
    fn zero_time_is_a_valid_start() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(0, 1), (1, 0)]);
        assert_eq!(out, vec!["0,0,1"]);
    }

    #[test]
    fn unchanged_level_only_accumulates() {
        let mut d = EventDetector::new();
        feed(&mut d, &[(1, 2), (2, 2), (3, 2)]);
        assert_eq!(
            d.open_interval(Threshold::PosTwo),
            Some(OpenInterval { start: 1, end: 3 })
        );
        assert!(d.pending(Threshold::PosTwo).is_empty());
    }

    #[test]
    fn nothing_is_flushed_at_stream_end() {
        let mut d = EventDetector::new();
        let out = feed(&mut d, &[(1, 2), (2, 1), (3, 1)]);
        assert!(out.is_empty());
        assert_eq!(d.pending(Threshold::PosTwo).len(), 1);
        assert!(d.open_interval(Threshold::PosOne).is_some());
    }

    #[test]
    fn rising_from_one_to_two_does_not_close() {
        let mut d = EventDetector::new();
        feed(&mut d, &[(1, 1), (2, 2)]);
        assert!(d.pending(Threshold::PosOne).is_empty());
        assert!(d.pending(Threshold::PosTwo).is_empty());
        assert_eq!(d.last_level().value(), 2);
    }

    #[test]
    fn reset_matches_fresh_detector() {
        let mut d = EventDetector::new();
        feed(&mut d, &[(1, 2), (2, 1), (3, -2)]);
        d.reset();

        assert_eq!(d.last_level(), Level::ZERO);
        for t in Threshold::ALL {
            assert!(d.open_interval(t).is_none());
            assert!(d.pending(t).is_empty());
        }

        let input = [(1, 0), (2, 1), (4, 1), (5, 0)];
        let mut fresh = EventDetector::new();
        assert_eq!(feed(&mut d, &input), feed(&mut fresh, &input));
    }

    #[test]
    fn observe_returns_published_records() {
        let mut d = EventDetector::new();
        assert!(d.observe(sample(1, -1)).is_empty());
        let out = d.observe(sample(2, 0));
        assert_eq!(
            out,
            vec![IntervalRecord {
                start: 1,
                end: 1,
                threshold: Threshold::NegOne
            }]
        );
    }
}
