// Data quality gate for a batch of raw generation records, checked before
// anything is transformed or written.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};
use serde_json::Value;

use crate::validation::Validator;

/// Settings for the expectation suites.  Pass it to [`QualityContext::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    pub min_settlement_period: i64,
    pub max_settlement_period: i64,
    pub column_count: usize,
    /// Seven days of half hourly data for three generation types.
    pub max_rows: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        QualityConfig {
            min_settlement_period: 1,
            max_settlement_period: 48,
            column_count: 7,
            max_rows: 1008,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    ColumnValuesBetween {
        column: String,
        min: i64,
        max: i64,
    },
    ColumnValuesNotNull {
        column: String,
    },
    ColumnToExist {
        column: String,
    },
    TableColumnCountToEqual {
        value: usize,
    },
    TableRowCountBetween {
        min: usize,
        max: usize,
    },
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expectation::*;
        match self {
            ColumnValuesBetween { column, min, max } => {
                write!(f, "values of {} between {} and {}", column, min, max)
            }
            ColumnValuesNotNull { column } => write!(f, "values of {} not null", column),
            ColumnToExist { column } => write!(f, "column {} exists", column),
            TableColumnCountToEqual { value } => write!(f, "column count equal to {}", value),
            TableRowCountBetween { min, max } => {
                write!(f, "row count between {} and {}", min, max)
            }
        }
    }
}

impl Expectation {
    /// Return a description of the unexpected values if the batch doesn't
    /// meet this expectation.  Nulls are ignored by the range check.
    pub fn check(&self, records: &[Value]) -> Result<(), String> {
        use Expectation::*;
        match self {
            ColumnValuesBetween { column, min, max } => {
                let unexpected = records
                    .iter()
                    .filter_map(|r| r.get(column))
                    .filter(|v| !v.is_null())
                    .filter(|v| match v.as_i64() {
                        Some(x) => x < *min || x > *max,
                        None => true,
                    })
                    .count();
                match unexpected {
                    0 => Ok(()),
                    n => Err(format!("{} unexpected values", n)),
                }
            }
            ColumnValuesNotNull { column } => {
                let unexpected = records
                    .iter()
                    .filter(|r| r.get(column).map_or(true, |v| v.is_null()))
                    .count();
                match unexpected {
                    0 => Ok(()),
                    n => Err(format!("{} null values", n)),
                }
            }
            ColumnToExist { column } => {
                if columns(records).contains(column.as_str()) {
                    Ok(())
                } else {
                    Err("column is missing".to_string())
                }
            }
            TableColumnCountToEqual { value } => match columns(records).len() {
                n if n == *value => Ok(()),
                n => Err(format!("found {} columns", n)),
            },
            TableRowCountBetween { min, max } => match records.len() {
                n if n >= *min && n <= *max => Ok(()),
                n => Err(format!("found {} rows", n)),
            },
        }
    }
}

/// All the keys that appear in any of the records.  Anything that is not a
/// JSON object contributes no columns.
fn columns(records: &[Value]) -> BTreeSet<&str> {
    records
        .iter()
        .filter_map(|r| r.as_object())
        .flat_map(|obj| obj.keys().map(|k| k.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub name: String,
    pub expectations: Vec<Expectation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub name: String,
    pub suites: Vec<Suite>,
}

/// The suites and checkpoints used to validate a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityContext {
    pub checkpoints: Vec<Checkpoint>,
}

impl QualityContext {
    pub fn init(config: &QualityConfig) -> QualityContext {
        let distribution = Suite {
            name: "distribution".into(),
            expectations: vec![Expectation::ColumnValuesBetween {
                column: "settlementPeriod".into(),
                min: config.min_settlement_period,
                max: config.max_settlement_period,
            }],
        };
        let missingness = Suite {
            name: "missingness".into(),
            expectations: vec![Expectation::ColumnValuesNotNull {
                column: "psrType".into(),
            }],
        };
        let schema = Suite {
            name: "schema".into(),
            expectations: vec![
                Expectation::ColumnToExist {
                    column: "settlementDate".into(),
                },
                Expectation::TableColumnCountToEqual {
                    value: config.column_count,
                },
            ],
        };
        let volume = Suite {
            name: "volume".into(),
            expectations: vec![Expectation::TableRowCountBetween {
                min: 0,
                max: config.max_rows,
            }],
        };

        QualityContext {
            checkpoints: vec![
                Checkpoint {
                    name: "statistical_checkpoint".into(),
                    suites: vec![distribution],
                },
                Checkpoint {
                    name: "completeness_checkpoint".into(),
                    suites: vec![missingness, schema, volume],
                },
            ],
        }
    }
}

/// Runs every checkpoint of a [`QualityContext`] over one batch of records.
pub struct DataValidator<'a> {
    context: &'a QualityContext,
    records: &'a [Value],
    errors: Vec<String>,
}

impl<'a> DataValidator<'a> {
    pub fn new(context: &'a QualityContext, records: &'a [Value]) -> DataValidator<'a> {
        DataValidator {
            context,
            records,
            errors: Vec::new(),
        }
    }
}

impl Validator for DataValidator<'_> {
    fn validate(&mut self) -> bool {
        let mut success = true;
        for checkpoint in &self.context.checkpoints {
            for suite in &checkpoint.suites {
                let mut failed = 0;
                for expectation in &suite.expectations {
                    if let Err(e) = expectation.check(self.records) {
                        failed += 1;
                        self.errors.push(format!(
                            "{}/{}: expected {}, {}",
                            checkpoint.name, suite.name, expectation, e
                        ));
                    }
                }
                if failed == 0 {
                    info!("{}/{} passed", checkpoint.name, suite.name);
                } else {
                    warn!(
                        "{}/{} failed {} of {} expectations",
                        checkpoint.name,
                        suite.name,
                        failed,
                        suite.expectations.len()
                    );
                    success = false;
                }
            }
        }
        success
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
