use std::fmt;
use std::fmt::Formatter;

use jiff::{RoundMode, Timestamp, TimestampRound, ToSpan, Unit};

/// A settlement period, 30 minutes long, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfHour {
    start: Timestamp,
}

impl HalfHour {
    /// Return the half hour that contains this instant.
    pub fn containing(ts: Timestamp) -> Result<HalfHour, jiff::Error> {
        let start = ts.round(
            TimestampRound::new()
                .smallest(Unit::Minute)
                .increment(30)
                .mode(RoundMode::Floor),
        )?;
        Ok(HalfHour { start })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.start + 30.minutes()
    }

    pub fn next(&self) -> HalfHour {
        HalfHour { start: self.end() }
    }
}

impl fmt::Display for HalfHour {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.start.strftime("%Y-%m-%d %H:%M").to_string())
    }
}
