use std::{env, path::Path, str::FromStr};

use log::{info, warn};
use thiserror::Error;

/// Actual or estimated wind and solar power generation, Elexon BMRS.
pub const DEFAULT_API_URL: &str =
    "https://data.elexon.co.uk/bmrs/api/v1/generation/actual/per-type/wind-and-solar";
pub const DEFAULT_SOURCE_ID: &str = "bmreports";
pub const DEFAULT_DUCKDB_PATH: &str = "psr.duckdb";
pub const DEFAULT_MAX_DAYS: i64 = 7;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Minutes a window boundary is allowed to fall on.
pub const VALID_MINUTES: [i8; 2] = [0, 30];

#[derive(Error, Debug, PartialEq)]
#[error("invalid value {value:?} for {name}")]
pub struct ConfigError {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub duckdb_path: String,
    pub api_url: String,
    pub source_id: String,
    pub max_days: i64,
    /// Include the minute-boundary rule in the aggregate parameter validation.
    pub validate_minutes: bool,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            duckdb_path: DEFAULT_DUCKDB_PATH.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            source_id: DEFAULT_SOURCE_ID.to_string(),
            max_days: DEFAULT_MAX_DAYS,
            validate_minutes: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from a variable lookup, falling back to the
    /// defaults for anything not set.
    pub fn from_vars<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Config::default();
        Ok(Config {
            duckdb_path: lookup("PSR_DUCKDB_PATH").unwrap_or(default.duckdb_path),
            api_url: lookup("PSR_API_URL").unwrap_or(default.api_url),
            source_id: lookup("PSR_SOURCE_ID").unwrap_or(default.source_id),
            max_days: parse_var(&lookup, "PSR_MAX_DAYS", default.max_days)?,
            validate_minutes: parse_var(&lookup, "PSR_VALIDATE_MINUTES", default.validate_minutes)?,
            http_timeout_secs: parse_var(
                &lookup,
                "PSR_HTTP_TIMEOUT_SECS",
                default.http_timeout_secs,
            )?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError {
            name: name.to_string(),
            value,
        }),
    }
}

/// Load `.env/{env}.env` into the process environment.  A missing file is
/// not an error, the variables may come from the scheduler instead.
pub fn load_dotenv(env: &str) {
    let path = format!(".env/{}.env", env);
    match dotenvy::from_path(Path::new(&path)) {
        Ok(_) => info!("loaded environment from {}", path),
        Err(e) => warn!("could not load {}: {}", path, e),
    }
}
