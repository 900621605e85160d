use std::sync::LazyLock;

use jiff::{civil, tz::TimeZone, Timestamp};
use regex::Regex;

use crate::config::{DEFAULT_MAX_DAYS, VALID_MINUTES};
use crate::validation::Validator;

pub const FORMAT_ERROR: &str = "Expected format is 'YYYY-MM-DD HH:MM'.";
pub const MINUTES_ERROR: &str = "Minutes must be either 00 or 30.";
pub const ORDER_ERROR: &str = "From date must be before or equal to To date.";

static FRACTIONAL_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\d{3,6}").unwrap());

/// Normalize a datetime string as typed by a user into an ISO8601 UTC form.
///
/// A `+00:00` offset becomes `Z`, anything after the first `Z` is dropped,
/// and fractional seconds are removed last so that a fraction sitting
/// right before a truncated `Z` goes away too.
///
/// ```
/// use psr_sync::validation::parameter_validation::clean;
/// assert_eq!(clean("2025-05-20T12:00:00.123Z:00+00"), "2025-05-20T12:00:00Z");
/// ```
pub fn clean(dt: &str) -> String {
    let mut dt = dt.replace("+00:00", "Z");
    if let Some(i) = dt.find('Z') {
        dt.truncate(i + 1);
    }
    FRACTIONAL_SECONDS.replace_all(&dt, "").into_owned()
}

/// Parse a cleaned datetime string as an instant.  Strings without an offset
/// are taken to be in UTC, a bare date means midnight UTC.
pub fn parse_utc(dt: &str) -> Result<Timestamp, jiff::Error> {
    let dt = dt.trim().replacen(' ', "T", 1);
    if let Ok(ts) = dt.parse::<Timestamp>() {
        return Ok(ts);
    }
    if let Ok(cdt) = dt.parse::<civil::DateTime>() {
        return Ok(cdt.to_zoned(TimeZone::UTC)?.timestamp());
    }
    let date = dt.parse::<civil::Date>()?;
    Ok(date.to_zoned(TimeZone::UTC)?.timestamp())
}

/// Checks the `(date_from, date_to)` window requested for a manual run.
///
/// If either input fails to parse, a single format error is recorded and the
/// window stays unset.  The individual checks then return `false` without
/// recording anything else.
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    window: Option<(Timestamp, Timestamp)>,
    max_days: i64,
    minute_rule: bool,
    errors: Vec<String>,
}

impl ParameterValidator {
    pub fn new(date_from: &str, date_to: &str) -> ParameterValidator {
        let mut errors = Vec::new();
        let window = match (parse_utc(&clean(date_from)), parse_utc(&clean(date_to))) {
            (Ok(from), Ok(to)) => Some((from, to)),
            _ => {
                errors.push(FORMAT_ERROR.to_string());
                None
            }
        };
        ParameterValidator {
            window,
            max_days: DEFAULT_MAX_DAYS,
            minute_rule: false,
            errors,
        }
    }

    /// Span limit used by [`Validator::validate`].
    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }

    /// Include [`ParameterValidator::validate_minutes`] in [`Validator::validate`].
    pub fn with_minute_rule(mut self, enabled: bool) -> Self {
        self.minute_rule = enabled;
        self
    }

    pub fn date_from(&self) -> Option<Timestamp> {
        self.window.map(|w| w.0)
    }

    pub fn date_to(&self) -> Option<Timestamp> {
        self.window.map(|w| w.1)
    }

    /// Both ends must fall on minute 00 or 30.
    pub fn validate_minutes(&mut self) -> bool {
        let Some((from, to)) = self.window else {
            return false;
        };
        for ts in [from, to] {
            let minute = ts.to_zoned(TimeZone::UTC).minute();
            if !VALID_MINUTES.contains(&minute) {
                self.errors.push(MINUTES_ERROR.to_string());
                return false;
            }
        }
        true
    }

    pub fn validate_date_order(&mut self) -> bool {
        let Some((from, to)) = self.window else {
            return false;
        };
        if from > to {
            self.errors.push(ORDER_ERROR.to_string());
            return false;
        }
        true
    }

    /// The window spans at most `max_days` whole days.  The span is measured
    /// without regard to the order of the two ends.
    pub fn validate_days_range(&mut self, max_days: i64) -> bool {
        let Some((from, to)) = self.window else {
            return false;
        };
        let days = to.duration_since(from).abs().as_hours() / 24;
        if days > max_days {
            self.errors
                .push(format!("Date range should not exceed {} days.", max_days));
            return false;
        }
        true
    }
}

impl Validator for ParameterValidator {
    fn validate(&mut self) -> bool {
        // a parse failure has already been recorded
        if !self.errors.is_empty() {
            return false;
        }
        if self.minute_rule && !self.validate_minutes() {
            return false;
        }
        if !self.validate_date_order() {
            return false;
        }
        self.validate_days_range(self.max_days)
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
