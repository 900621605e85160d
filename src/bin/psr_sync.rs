use std::error::Error;

use clap::Parser;
use jiff::Timestamp;
use log::{error, info};
use psr_sync::{
    config::{load_dotenv, Config},
    db::prod_db::ProdDb,
    pipeline::{parameterize, run, RunParams, RunType},
    validation::{
        data_validation::{QualityConfig, QualityContext},
        parameter_validation::{clean, parse_utc},
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    #[arg(short, long, value_enum, default_value_t = RunType::Scheduled)]
    run_type: RunType,

    /// Start of the window for a manual run, e.g. "2024-10-15 00:00"
    #[arg(long)]
    date_from: Option<String>,

    /// End of the window for a manual run, e.g. "2024-10-16 00:30"
    #[arg(long)]
    date_to: Option<String>,

    /// The instant the run is for, defaults to now
    #[arg(long, value_parser = parse_logical_date)]
    logical_date: Option<Timestamp>,
}

fn parse_logical_date(s: &str) -> Result<Timestamp, String> {
    parse_utc(&clean(s)).map_err(|e| e.to_string())
}

/// Sync wind and solar generation from Elexon into DuckDB.
/// Run this job at minute 5 and 35 of every hour.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    load_dotenv(&args.env);
    let config = Config::from_env()?;

    let params = RunParams {
        run_type: args.run_type,
        date_from: args.date_from,
        date_to: args.date_to,
        logical_date: args.logical_date,
    };
    let window = match parameterize(&config, &params) {
        Ok(window) => window,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("{} run for {}", params.run_type, window);

    let source = ProdDb::bmrs_client(&config)?;
    let mut archive = ProdDb::psr(&config);
    let quality = QualityContext::init(&QualityConfig::default());
    match run(&source, &mut archive, &quality, &window) {
        Ok(summary) => info!(
            "fetched {} records, wrote {} rows",
            summary.fetched, summary.written
        ),
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
