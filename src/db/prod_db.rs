use std::time::Duration;

use crate::config::Config;
use crate::db::elexon::{lib_bmrs::BmrsClient, lib_bmrs::FetchError, psr_archive::PsrArchive};

/// Builds the archives and clients of a deployment from its configuration.
pub struct ProdDb {}

impl ProdDb {
    pub fn psr(config: &Config) -> PsrArchive {
        PsrArchive {
            duckdb_path: config.duckdb_path.clone(),
            source_id: config.source_id.clone(),
        }
    }

    pub fn bmrs_client(config: &Config) -> Result<BmrsClient, FetchError> {
        BmrsClient::new(
            &config.api_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }
}
