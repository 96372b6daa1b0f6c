//! The four non-zero thresholds tracked by the detector.

use std::fmt;

use crate::sample::Level;

/// A non-zero level whose excursions are tracked.
///
/// Negative thresholds are reached by levels at or below them, positive
/// thresholds by levels at or above them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    NegTwo,
    NegOne,
    PosOne,
    PosTwo,
}

impl Threshold {
    pub const ALL: [Threshold; 4] = [
        Threshold::NegTwo,
        Threshold::NegOne,
        Threshold::PosOne,
        Threshold::PosTwo,
    ];

    /// Positive side in flush order, outer threshold first.
    pub const POSITIVE: [Threshold; 2] = [Threshold::PosOne, Threshold::PosTwo];

    /// Negative side in flush order, outer threshold first.
    pub const NEGATIVE: [Threshold; 2] = [Threshold::NegOne, Threshold::NegTwo];

    pub const COUNT: usize = Self::ALL.len();

    pub fn value(self) -> i8 {
        match self {
            Threshold::NegTwo => -2,
            Threshold::NegOne => -1,
            Threshold::PosOne => 1,
            Threshold::PosTwo => 2,
        }
    }

    /// Position in per-threshold state arrays.
    pub fn slot(self) -> usize {
        match self {
            Threshold::NegTwo => 0,
            Threshold::NegOne => 1,
            Threshold::PosOne => 2,
            Threshold::PosTwo => 3,
        }
    }

    pub fn is_reached_by(self, level: Level) -> bool {
        let (t, v) = (self.value(), level.value());
        if t < 0 {
            v <= t
        } else {
            v >= t
        }
    }

    /// Every threshold `level` reaches. Empty for level zero.
    pub fn reached_by(level: Level) -> impl Iterator<Item = Threshold> {
        Self::ALL.into_iter().filter(move |t| t.is_reached_by(level))
    }

    /// The extreme threshold equal to `level`, if `level` is ±2.
    pub fn extreme(level: Level) -> Option<Threshold> {
        match level.value() {
            2 => Some(Threshold::PosTwo),
            -2 => Some(Threshold::NegTwo),
            _ => None,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
