use std::error::Error;

use duckdb::Connection;
use jiff::{Timestamp, ToSpan};
use psr_sync::{
    config::Config,
    db::{
        elexon::lib_bmrs::{FetchError, Payload},
        prod_db::ProdDb,
    },
    interval::DateWindow,
    pipeline::{parameterize, run, RunParams, RunType, Source},
    validation::data_validation::{QualityConfig, QualityContext},
};
use serde_json::json;

/// Serves one Wind Onshore and one Solar record per half hour of the window.
struct HalfHourlySource;

impl Source for HalfHourlySource {
    fn fetch_json(&self, window: &DateWindow) -> Result<Payload, FetchError> {
        let mut data = Vec::new();
        for (i, hh) in window.half_hours().unwrap().iter().enumerate() {
            for psr_type in ["Wind Onshore", "Solar"] {
                data.push(json!({
                    "publishTime": "2024-10-16T06:58:08Z",
                    "businessType": "Generation",
                    "psrType": psr_type,
                    "quantity": 100.0 + i as f64,
                    "startTime": hh.start().to_string(),
                    "settlementDate": hh.start().strftime("%Y-%m-%d").to_string(),
                    "settlementPeriod": (i % 48) + 1
                }));
            }
        }
        Ok(Payload { data })
    }
}

#[test]
fn manual_run_into_duckdb() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config = Config {
        duckdb_path: dir.path().join("psr.duckdb").to_str().unwrap().to_string(),
        ..Config::default()
    };
    let params = RunParams {
        run_type: RunType::Manual,
        date_from: Some("2024-10-15T00:00:00.000Z".into()),
        date_to: Some("2024-10-15 23:30".into()),
        logical_date: None,
    };
    let window = parameterize(&config, &params)?;
    let mut archive = ProdDb::psr(&config);
    let quality = QualityContext::init(&QualityConfig::default());

    let summary = run(&HalfHourlySource, &mut archive, &quality, &window)?;
    assert_eq!(summary.fetched, 96);
    assert_eq!(summary.written, 96);

    let conn = Connection::open(&config.duckdb_path)?;
    let rows = archive.get_rows(&conn, "bmreports, Solar, min30", &window)?;
    assert_eq!(rows.len(), 48);
    let start: Timestamp = "2024-10-15T00:00:00Z".parse()?;
    assert_eq!(rows[0].curve_date, start);
    assert_eq!(rows[47].curve_date, start + 1410.minutes());
    assert_eq!(rows[47].value, 147.0);
    Ok(())
}

#[test]
fn overlapping_runs_keep_one_row_per_key() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config = Config {
        duckdb_path: dir.path().join("psr.duckdb").to_str().unwrap().to_string(),
        ..Config::default()
    };
    let mut archive = ProdDb::psr(&config);
    let quality = QualityContext::init(&QualityConfig::default());

    for logical_date in ["2024-10-15T10:07:00Z", "2024-10-15T10:29:59Z"] {
        let params = RunParams {
            run_type: RunType::Scheduled,
            date_from: None,
            date_to: None,
            logical_date: Some(logical_date.parse()?),
        };
        let window = parameterize(&config, &params)?;
        run(&HalfHourlySource, &mut archive, &quality, &window)?;
    }

    let conn = Connection::open(&config.duckdb_path)?;
    let count: i64 = conn.query_row("SELECT count(*) FROM psr", [], |r| r.get(0))?;
    assert_eq!(count, 2);
    Ok(())
}
