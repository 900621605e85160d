// Half hourly wind and solar generation by PSR type, from Elexon BMRS.
// https://bmrs.elexon.co.uk/actual-or-estimated-wind-and-solar-power-generation

use std::time::Duration;

use duckdb::{params, AccessMode, Connection};
use itertools::Itertools;
use jiff::Timestamp;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::elexon::lib_bmrs::Payload;
use crate::interval::DateWindow;
use crate::pipeline::Sink;
use crate::utils::lib_duckdb::open_with_retry;

#[derive(Error, Debug)]
#[error("record {index}: {source}")]
pub struct TransformError {
    pub index: usize,
    pub source: serde_json::Error,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] jiff::Error),
}

/// The fields of an API record that end up in the table.  The other fields
/// (`publishTime`, `settlementDate`, ...) are only looked at by the quality
/// checks and are not parsed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub psr_type: String,
    pub quantity: f64,
    pub start_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertRecord {
    pub curve_name: String,
    pub curve_date: Timestamp,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct PsrArchive {
    pub duckdb_path: String,
    /// Prefix of the curve names, e.g. `bmreports`.
    pub source_id: String,
}

/// Name of the curve a PSR type is stored under, e.g.
/// `bmreports, Wind Onshore, min30`.
fn curve_name(source_id: &str, psr_type: &str) -> String {
    format!("{}, {}, min30", source_id, psr_type)
}

/// Flatten the payload into rows ready for the upsert, in the same order.
/// Fails on the first record that is missing a required field.
pub fn transform(source_id: &str, payload: &Payload) -> Result<Vec<UpsertRecord>, TransformError> {
    payload
        .data
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let record = RawRecord::deserialize(value)
                .map_err(|source| TransformError { index, source })?;
            Ok(UpsertRecord {
                curve_name: curve_name(source_id, &record.psr_type),
                curve_date: record.start_time,
                value: record.quantity,
            })
        })
        .collect()
}

impl PsrArchive {
    pub fn create_table(&self, conn: &Connection) -> Result<(), SyncError> {
        conn.execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS psr (
    curve_name VARCHAR(255) NOT NULL,
    curve_date TIMESTAMPTZ NOT NULL,
    value DOUBLE,
    PRIMARY KEY (curve_name, curve_date)
);
COMMENT ON TABLE psr IS 'Power generation data for different curves over time.';
COMMENT ON COLUMN psr.curve_name IS 'The name of the curve, representing the type of power generation (e.g., solar, wind).';
COMMENT ON COLUMN psr.curve_date IS 'Timestamp indicating the start_date, stored in UTC.';
COMMENT ON COLUMN psr.value IS 'The measured value associated with the curve at the specified date and time.';
"#,
        )?;
        Ok(())
    }

    /// Insert the rows in one transaction, replacing the value of rows that
    /// already exist.  If a key shows up more than once, the last one wins.
    /// Nothing is written if any row fails.
    pub fn upsert_rows(
        &self,
        conn: &mut Connection,
        rows: &[UpsertRecord],
    ) -> Result<usize, SyncError> {
        let rows: Vec<&UpsertRecord> = rows
            .iter()
            .rev()
            .unique_by(|r| (r.curve_name.clone(), r.curve_date))
            .collect();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
INSERT INTO psr (curve_name, curve_date, value)
VALUES (?, ?::TIMESTAMPTZ, ?)
ON CONFLICT (curve_name, curve_date) DO UPDATE SET value = EXCLUDED.value;
"#,
            )?;
            for row in rows.iter().rev() {
                stmt.execute(params![
                    row.curve_name,
                    row.curve_date.to_string(),
                    row.value
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Get the stored values of one curve for the window, ordered by date.
    pub fn get_rows(
        &self,
        conn: &Connection,
        curve_name: &str,
        window: &DateWindow,
    ) -> Result<Vec<UpsertRecord>, SyncError> {
        let mut stmt = conn.prepare(
            r#"
SELECT curve_name, epoch_us(curve_date) AS micros, value
FROM psr
WHERE curve_name = ?
AND curve_date >= ?::TIMESTAMPTZ
AND curve_date <= ?::TIMESTAMPTZ
AND value IS NOT NULL
ORDER BY curve_date;
"#,
        )?;
        let res_iter = stmt.query_map(
            params![
                curve_name,
                window.date_from().to_string(),
                window.date_to().to_string()
            ],
            |row| {
                Ok((
                    row.get::<usize, String>(0)?,
                    row.get::<usize, i64>(1)?,
                    row.get::<usize, f64>(2)?,
                ))
            },
        )?;
        let mut out: Vec<UpsertRecord> = Vec::new();
        for row in res_iter {
            let (curve_name, micros, value) = row?;
            out.push(UpsertRecord {
                curve_name,
                curve_date: Timestamp::from_microsecond(micros)?,
                value,
            });
        }
        Ok(out)
    }
}

impl Sink for PsrArchive {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn upsert(&mut self, rows: &[UpsertRecord]) -> Result<usize, SyncError> {
        let mut conn = open_with_retry(
            &self.duckdb_path,
            8,
            Duration::from_millis(25),
            AccessMode::ReadWrite,
        )?;
        self.create_table(&conn)?;
        let n = self.upsert_rows(&mut conn, rows)?;
        info!("upserted {} rows into {}", n, self.duckdb_path);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use serde_json::{json, Value};

    use super::*;

    fn archive() -> PsrArchive {
        PsrArchive {
            duckdb_path: ":memory:".into(),
            source_id: "bmreports".into(),
        }
    }

    fn mock_payload() -> Payload {
        serde_json::from_value(json!({"data": [
            {
                "publishTime": "2023-07-21T06:58:08Z",
                "businessType": "Wind generation",
                "psrType": "Wind Onshore",
                "quantity": 640.283,
                "startTime": "2023-07-21T04:30:00Z",
                "settlementDate": "2023-07-21",
                "settlementPeriod": 12
            },
            {
                "publishTime": "2023-07-21T06:58:08Z",
                "businessType": "Wind generation",
                "psrType": "Wind Offshore",
                "quantity": 77.014,
                "startTime": "2023-07-21T04:30:00Z",
                "settlementDate": "2023-07-21",
                "settlementPeriod": 12
            },
            {
                "publishTime": "2023-07-21T06:58:08Z",
                "businessType": "Solar generation",
                "psrType": "Solar",
                "quantity": 89,
                "startTime": "2023-07-21T04:30:00Z",
                "settlementDate": "2023-07-21",
                "settlementPeriod": 12
            }
        ]}))
        .unwrap()
    }

    fn row(curve_name: &str, curve_date: &str, value: f64) -> UpsertRecord {
        UpsertRecord {
            curve_name: curve_name.into(),
            curve_date: curve_date.parse().unwrap(),
            value,
        }
    }

    #[test]
    fn transform_payload() -> Result<(), Box<dyn Error>> {
        let rows = transform("bmreports", &mock_payload())?;
        assert_eq!(
            rows,
            vec![
                row("bmreports, Wind Onshore, min30", "2023-07-21T04:30:00Z", 640.283),
                row("bmreports, Wind Offshore, min30", "2023-07-21T04:30:00Z", 77.014),
                row("bmreports, Solar, min30", "2023-07-21T04:30:00Z", 89.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn transform_keeps_duplicates() -> Result<(), Box<dyn Error>> {
        let mut payload = mock_payload();
        payload.data.push(payload.data[0].clone());
        let rows = transform("bmreports", &payload)?;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], rows[3]);
        Ok(())
    }

    #[test]
    fn transform_missing_field() {
        let mut payload = mock_payload();
        payload.data[2].as_object_mut().unwrap().remove("quantity");
        let err = transform("bmreports", &payload).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(err.to_string().starts_with("record 2: missing field `quantity`"));
    }

    #[test]
    fn transform_ignores_other_fields() -> Result<(), Box<dyn Error>> {
        let mut payload = mock_payload();
        payload.data[0]["publishTime"] = json!("2023-07-21 06:58");
        payload.data[1]["settlementDate"] = json!(20230721);
        payload.data[2]["settlementPeriod"] = json!("twelve");
        payload.data[2]["businessType"] = Value::Null;
        let rows = transform("bmreports", &payload)?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value, 640.283);

        // a start time without an offset is still rejected
        payload.data[1]["startTime"] = json!("2023-07-21 04:30");
        let err = transform("bmreports", &payload).unwrap_err();
        assert_eq!(err.index, 1);
        Ok(())
    }

    #[test]
    fn upsert_last_write_wins() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        archive.create_table(&conn)?;
        let rows = transform(&archive.source_id, &mock_payload())?;
        assert_eq!(archive.upsert_rows(&mut conn, &rows)?, 3);

        let name = "bmreports, Wind Onshore, min30";
        let updated = vec![row(name, "2023-07-21T04:30:00Z", 700.5)];
        archive.upsert_rows(&mut conn, &updated)?;

        let window = DateWindow::single("2023-07-21T04:30:00Z".parse()?);
        let stored = archive.get_rows(&conn, name, &window)?;
        assert_eq!(stored, updated);

        let count: i64 = conn.query_row("SELECT count(*) FROM psr", [], |r| r.get(0))?;
        assert_eq!(count, 3);
        Ok(())
    }

    #[test]
    fn upsert_duplicates_in_batch() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        archive.create_table(&conn)?;
        let name = "bmreports, Solar, min30";
        let rows = vec![
            row(name, "2023-07-21T04:30:00Z", 1.0),
            row(name, "2023-07-21T05:00:00Z", 2.0),
            row(name, "2023-07-21T04:30:00Z", 3.0),
        ];
        assert_eq!(archive.upsert_rows(&mut conn, &rows)?, 2);
        let window = DateWindow::with_start_end(
            "2023-07-21T00:00:00Z".parse()?,
            "2023-07-21T23:30:00Z".parse()?,
        )
        .unwrap();
        assert_eq!(
            archive.get_rows(&conn, name, &window)?,
            vec![
                row(name, "2023-07-21T04:30:00Z", 3.0),
                row(name, "2023-07-21T05:00:00Z", 2.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn upsert_is_all_or_nothing() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        // same table with a constraint the second row violates
        conn.execute_batch(
            r#"
CREATE TABLE psr (
    curve_name VARCHAR(255) NOT NULL,
    curve_date TIMESTAMPTZ NOT NULL,
    value DOUBLE CHECK (value >= 0),
    PRIMARY KEY (curve_name, curve_date)
);"#,
        )?;
        let name = "bmreports, Solar, min30";
        let rows = vec![
            row(name, "2023-07-21T04:30:00Z", 1.0),
            row(name, "2023-07-21T05:00:00Z", -1.0),
        ];
        assert!(matches!(
            archive.upsert_rows(&mut conn, &rows),
            Err(SyncError::DuckDb(_))
        ));
        let count: i64 = conn.query_row("SELECT count(*) FROM psr", [], |r| r.get(0))?;
        assert_eq!(count, 0);
        Ok(())
    }
}
