pub mod half_hour;

use std::fmt;

use jiff::Timestamp;

use crate::interval::half_hour::HalfHour;

/// A closed window `[date_from, date_to]` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    date_from: Timestamp,
    date_to: Timestamp,
}

impl DateWindow {
    /// Return `None` for an inverted window.
    pub fn with_start_end(date_from: Timestamp, date_to: Timestamp) -> Option<DateWindow> {
        if date_to < date_from {
            return None;
        }
        Some(DateWindow { date_from, date_to })
    }

    /// A window that starts and ends at the same instant.
    pub fn single(ts: Timestamp) -> DateWindow {
        DateWindow {
            date_from: ts,
            date_to: ts,
        }
    }

    pub fn date_from(&self) -> Timestamp {
        self.date_from
    }

    pub fn date_to(&self) -> Timestamp {
        self.date_to
    }

    /// Floor both ends to the start of their half hour.
    pub fn floored(&self) -> Result<DateWindow, jiff::Error> {
        Ok(DateWindow {
            date_from: HalfHour::containing(self.date_from)?.start(),
            date_to: HalfHour::containing(self.date_to)?.start(),
        })
    }

    /// The half hours that start inside this window.
    pub fn half_hours(&self) -> Result<Vec<HalfHour>, jiff::Error> {
        let mut out: Vec<HalfHour> = Vec::new();
        let mut hh = HalfHour::containing(self.date_from)?;
        if hh.start() < self.date_from {
            hh = hh.next();
        }
        while hh.start() <= self.date_to {
            out.push(hh);
            hh = hh.next();
        }
        Ok(out)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.date_from.strftime("%Y-%m-%d %H:%M"),
            self.date_to.strftime("%Y-%m-%d %H:%M")
        )
    }
}
