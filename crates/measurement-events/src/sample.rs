//! Measurement samples and the `<time>,<level>` line format.

use std::fmt;
use std::str;

use crate::error::LineError;

/// Lowest accepted level.
pub const MIN_LEVEL: i8 = -2;

/// Highest accepted level.
pub const MAX_LEVEL: i8 = 2;

/// A discrete signal level, always within `[MIN_LEVEL, MAX_LEVEL]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i8);

impl Level {
    pub const ZERO: Level = Level(0);

    /// Returns `None` when `value` is out of range.
    pub fn new(value: i64) -> Option<Self> {
        if (i64::from(MIN_LEVEL)..=i64::from(MAX_LEVEL)).contains(&value) {
            Some(Level(value as i8))
        } else {
            None
        }
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl TryFrom<i64> for Level {
    type Error = LineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Level::new(value).ok_or(LineError::InvalidLevel)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One timestamped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub time: i64,
    pub level: Level,
}

impl Sample {
    pub fn new(time: i64, level: Level) -> Self {
        Self { time, level }
    }
}

/// Parse one input line of the form `<time>,<level>`.
///
/// The line may still carry its `\n` or `\r\n` terminator. The time field
/// is everything before the first comma; the level field is everything
/// after it. A bad time field yields [`LineError::Ignored`], a bad or out
/// of range level yields [`LineError::InvalidLevel`].
pub fn parse_line(line: &[u8]) -> Result<Sample, LineError> {
    let line = trim_terminator(line);

    let comma = line
        .iter()
        .position(|b| *b == b',')
        .ok_or(LineError::Ignored)?;

    let time = parse_int(&line[..comma]).ok_or(LineError::Ignored)?;
    let level = parse_int(&line[comma + 1..]).ok_or(LineError::InvalidLevel)?;

    Ok(Sample::new(time, Level::try_from(level)?))
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_int(field: &[u8]) -> Option<i64> {
    str::from_utf8(field).ok()?.parse().ok()
}
