// src/fetch/mod.rs
//
// Source Adapters. One module per source type, all returning the same
// RawTable shape; everything source-specific and fragile stays behind
// this seam. New sources are new modules here, never branches in the
// diff engine or publisher.

mod csv_feed;
pub mod extract;
mod page;
mod render;

use std::time::Duration;

use tracing::warn;

use crate::error::{FetchError, FetchKind};
use crate::params::{DEFAULT_FETCH_ATTEMPTS, DEFAULT_TIMEOUT_SECS, HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::sources::{SourceSpec, SourceType};
use crate::table::RawTable;

pub use csv_feed::parse as parse_csv_feed;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Deadline for the rendered-page wait.
    pub timeout: Duration,
    /// Attempts per instrument before the error is surfaced.
    pub attempts: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }
}

/// Retrieve one instrument's raw table, retrying a bounded number of
/// times. A failed fetch is always a `FetchError`, never an empty table
/// standing in for one.
pub fn fetch(code: &str, spec: &SourceSpec, opts: &FetchOptions) -> Result<RawTable, FetchError> {
    let attempts = opts.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match spec.kind {
            SourceType::Render => render::fetch(&spec.url, opts.timeout),
            SourceType::Html => page::fetch(&spec.url),
            SourceType::Csv => csv_feed::fetch(&spec.url),
        };

        match result {
            Ok(table) => return Ok(table),
            Err(kind) if attempt < attempts => {
                warn!(code, attempt, error = %kind, "fetch attempt failed, retrying");
            }
            Err(kind) => {
                return Err(FetchError {
                    code: code.to_string(),
                    kind,
                })
            }
        }
    }
}

/// Shared GET for the static-page and CSV variants.
fn http_get(url: &str) -> Result<String, FetchKind> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    let resp = client.get(url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchKind::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text()?)
}
