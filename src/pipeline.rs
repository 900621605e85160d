use std::fmt;

use clap::ValueEnum;
use jiff::Timestamp;
use log::{error, info};
use thiserror::Error;

use crate::config::Config;
use crate::db::elexon::lib_bmrs::{BmrsClient, FetchError, Payload};
use crate::db::elexon::psr_archive::{transform, SyncError, TransformError, UpsertRecord};
use crate::interval::{half_hour::HalfHour, DateWindow};
use crate::validation::data_validation::{DataValidator, QualityContext};
use crate::validation::parameter_validation::ParameterValidator;
use crate::validation::Validator;

/// Where the raw records come from.
pub trait Source {
    fn fetch_json(&self, window: &DateWindow) -> Result<Payload, FetchError>;
}

impl Source for BmrsClient {
    fn fetch_json(&self, window: &DateWindow) -> Result<Payload, FetchError> {
        BmrsClient::fetch_json(self, window)
    }
}

/// Where the transformed rows go.  Writing the same rows twice must leave
/// the storage as if they were written once.
pub trait Sink {
    /// Prefix of the curve names the rows are stored under.
    fn source_id(&self) -> &str;

    fn upsert(&mut self, rows: &[UpsertRecord]) -> Result<usize, SyncError>;
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidParameters(String),
    #[error("Data fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Data validation failed: {0}")]
    DataQuality(String),
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("Data sync failed: {0}")]
    Sync(#[from] SyncError),
    #[error("invalid date: {0}")]
    Date(#[from] jiff::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunType {
    /// Dates supplied by the user, validated before use.
    Manual,
    /// Fill in the past half hour containing the logical date.
    Backfill,
    /// The half hour containing the logical date, now by default.
    Scheduled,
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RunType::*;
        match self {
            Manual => write!(f, "manual"),
            Backfill => write!(f, "backfill"),
            Scheduled => write!(f, "scheduled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub run_type: RunType,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// The instant the run is for, defaults to now.
    pub logical_date: Option<Timestamp>,
}

/// Work out the window for a run.
///
/// Manual runs validate the user's dates and fall back to the logical date
/// for a missing one.  Every window is floored to the half hour.
pub fn parameterize(config: &Config, params: &RunParams) -> Result<DateWindow, PipelineError> {
    let logical = HalfHour::containing(params.logical_date.unwrap_or_else(Timestamp::now))?;
    match params.run_type {
        RunType::Manual => {
            let default = logical.start().to_string();
            let date_from = params.date_from.as_deref().unwrap_or(&default);
            let date_to = params.date_to.as_deref().unwrap_or(&default);
            let mut validator = ParameterValidator::new(date_from, date_to)
                .with_max_days(config.max_days)
                .with_minute_rule(config.validate_minutes);
            if !validator.validate() {
                let msg = validator.last_error().unwrap_or_default().to_string();
                return Err(PipelineError::InvalidParameters(msg));
            }
            let window = match (validator.date_from(), validator.date_to()) {
                (Some(from), Some(to)) => DateWindow::with_start_end(from, to),
                _ => None,
            };
            match window {
                Some(window) => Ok(window.floored()?),
                None => Err(PipelineError::InvalidParameters(
                    "invalid date window".to_string(),
                )),
            }
        }
        RunType::Backfill | RunType::Scheduled => Ok(DateWindow::single(logical.start())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub window: DateWindow,
    pub fetched: usize,
    pub written: usize,
}

/// Fetch, check, transform and store the data for one window.  Stops at the
/// first failure, the sink is not called unless everything before it passed.
pub fn run<S, K>(
    source: &S,
    sink: &mut K,
    quality: &QualityContext,
    window: &DateWindow,
) -> Result<RunSummary, PipelineError>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    info!(
        "syncing {} half hours for {}",
        window.half_hours()?.len(),
        window
    );
    let payload = source.fetch_json(window)?;
    info!("Data fetch successful");

    let mut validator = DataValidator::new(quality, &payload.data);
    if !validator.validate() {
        for e in validator.errors() {
            error!("{}", e);
        }
        let msg = validator.last_error().unwrap_or_default().to_string();
        return Err(PipelineError::DataQuality(msg));
    }

    let rows = transform(sink.source_id(), &payload)?;
    let written = sink.upsert(&rows)?;
    info!("Data sync successful");

    Ok(RunSummary {
        window: *window,
        fetched: payload.data.len(),
        written,
    })
}
