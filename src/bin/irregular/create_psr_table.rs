use std::{error::Error, time::Duration};

use clap::Parser;
use duckdb::AccessMode;
use log::info;
use psr_sync::{
    config::{load_dotenv, Config},
    db::prod_db::ProdDb,
    utils::lib_duckdb::open_with_retry,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,
}

/// Create the psr table if it doesn't exist yet.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    load_dotenv(&args.env);
    let config = Config::from_env()?;
    let archive = ProdDb::psr(&config);
    let conn = open_with_retry(
        &archive.duckdb_path,
        8,
        Duration::from_millis(25),
        AccessMode::ReadWrite,
    )?;
    archive.create_table(&conn)?;
    info!("psr table ready in {}", archive.duckdb_path);
    Ok(())
}
