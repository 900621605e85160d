use std::time::Duration;

use duckdb::{AccessMode, Config};
use log::warn;

/// Open a DuckDB connection, waiting for another process to release the file.
/// Only one process can hold a DuckDB file open for writing, so two runs
/// that overlap will queue here.
/// Suggested `max_attempts = 8`, `initial_wait = Duration::from_millis(25)`.
pub fn open_with_retry(
    duckdb_path: &str,
    max_attempts: u32,
    initial_wait: Duration,
    access_mode: AccessMode,
) -> Result<duckdb::Connection, duckdb::Error> {
    let mut attempts = 0;
    let mut wait_duration = initial_wait;

    loop {
        let config = Config::default().access_mode(copy_mode(&access_mode))?;
        match duckdb::Connection::open_with_flags(duckdb_path, config) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(e);
                }
                warn!(
                    "Retrying to open {} after error: {} (attempt {}/{})",
                    duckdb_path, e, attempts, max_attempts
                );
                std::thread::sleep(wait_duration);
                wait_duration *= 2;
            }
        }
    }
}

// AccessMode is neither Clone nor Copy, and Config takes it by value.
fn copy_mode(mode: &AccessMode) -> AccessMode {
    match mode {
        AccessMode::Automatic => AccessMode::Automatic,
        AccessMode::ReadOnly => AccessMode::ReadOnly,
        AccessMode::ReadWrite => AccessMode::ReadWrite,
    }
}
