// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Fetch failure for one instrument. An empty-but-well-formed table is a
/// legitimate fetch result, never a `FetchError`.
#[derive(Debug, Error)]
#[error("fetch failed for {code}")]
pub struct FetchError {
    pub code: String,
    #[source]
    pub kind: FetchKind,
}

#[derive(Debug, Error)]
pub enum FetchKind {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },

    // anyhow::Error only derefs to dyn Error, so it is displayed inline
    // rather than attached as a source.
    #[error("browser: {0:#}")]
    Browser(anyhow::Error),

    #[error("no populated holdings table settled within {secs}s")]
    RenderTimeout { secs: u64 },

    #[error("no candidate table in document")]
    NoTable,

    #[error("table has no columns")]
    NoColumns,

    #[error("row {row} has {got} cells, header has {want}")]
    RowWidth { row: usize, want: usize, got: usize },
}

/// The configured schema map does not fit the fetched table.
#[derive(Debug, Error)]
#[error("schema error for {code}")]
pub struct SchemaError {
    pub code: String,
    #[source]
    pub kind: SchemaKind,
}

#[derive(Debug, Error)]
pub enum SchemaKind {
    #[error("required column {0:?} missing after renaming")]
    MissingRequired(String),

    #[error("key column {0:?} missing after renaming")]
    MissingKey(String),

    #[error("duplicate canonical column {0:?} after renaming")]
    DuplicateColumn(String),

    #[error("schema map declares no key columns")]
    EmptyKey,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot at {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Programmer error: diffing snapshots of two different instruments.
/// Unreachable from the runner; fatal for the instrument if it ever fires.
#[derive(Debug, Error)]
#[error("diff inputs belong to different instruments: {left:?} vs {right:?}")]
pub struct DiffInputError {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read sources file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse sources file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("descriptor for {code}: {reason}")]
    Invalid { code: String, reason: String },
}

/// Union caught at the per-instrument orchestration boundary. One
/// instrument failing with any of these never aborts the others.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    DiffInput(#[from] DiffInputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Render an error with its full source chain, outermost first.
pub fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}
