use std::time::Duration;

use jiff::Timestamp;
use log::info;
use reqwest::{
    blocking::Client,
    header::{ACCEPT, USER_AGENT},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::interval::DateWindow;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("download failed with status {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Data is empty")]
    Empty,
}

/// The response body, records are left as raw JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub data: Vec<Value>,
}

/// Format a timestamp the way the API wants it in a query string,
/// e.g. `2024-10-16%2014%3A30`.
pub fn url_friendly_datetime(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%d %H:%M")
        .to_string()
        .replace(' ', "%20")
        .replace(':', "%3A")
}

/// Parse a response body.  A payload without any records is an error.
pub fn parse_payload(body: &str) -> Result<Payload, FetchError> {
    let payload: Payload = serde_json::from_str(body)?;
    if payload.data.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(payload)
}

#[derive(Debug, Clone)]
pub struct BmrsClient {
    pub base_url: String,
    client: Client,
}

impl BmrsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<BmrsClient, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(BmrsClient {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn url(&self, window: &DateWindow) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}from={}&to={}&format=json",
            self.base_url,
            sep,
            url_friendly_datetime(window.date_from()),
            url_friendly_datetime(window.date_to())
        )
    }

    /// One GET for the window, no retries.
    pub fn fetch_json(&self, window: &DateWindow) -> Result<Payload, FetchError> {
        let url = self.url(window);
        info!("fetching {}", url);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, concat!("psr-sync/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .send()?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status(),
                url,
            });
        }
        let body = response.text()?;
        let payload = parse_payload(&body)?;
        info!("fetched {} records for {}", payload.data.len(), window);
        Ok(payload)
    }
}
