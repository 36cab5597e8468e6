// src/sources.rs
//
// Per-instrument source descriptors. The descriptor file is a JSON map of
// instrument code → {type, url, schema_map}, validated up front so a bad
// entry fails loudly before any adapter runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// JavaScript-rendered page; needs a headless browser.
    Render,
    /// Server-rendered page; plain HTTP is enough.
    Html,
    /// Published CSV/portfolio file.
    Csv,
}

/// Declared column mapping for one instrument. Canonical names are the
/// values of `rename`; `required`, `key`, `numeric` and `percent` all refer
/// to canonical names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMap {
    /// Raw header (whitespace-normalized) → canonical column name.
    pub rename: BTreeMap<String, String>,
    /// Canonical columns that must exist after renaming.
    pub required: Vec<String>,
    /// Ordered canonical key columns; composite keys list more than one.
    pub key: Vec<String>,
    /// Canonical columns coerced to numbers.
    pub numeric: Vec<String>,
    /// Canonical columns holding percentage strings.
    pub percent: Vec<String>,
    /// Scale percent columns to fractions (4.23% → 0.0423) instead of
    /// display-scale numbers (4.23). Explicit per instrument.
    pub percent_as_fraction: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub url: String,
    pub schema_map: SchemaMap,
}

/// Load and validate the descriptor file. Codes come back sorted (BTreeMap)
/// so runs process instruments in a stable order.
pub fn load(path: &Path) -> Result<BTreeMap<String, SourceSpec>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let map: BTreeMap<String, SourceSpec> =
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    for (code, spec) in &map {
        validate(code, spec)?;
    }
    Ok(map)
}

pub fn validate(code: &str, spec: &SourceSpec) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        code: code.to_string(),
        reason,
    };

    if code.is_empty() {
        return Err(invalid(s!("empty instrument code")));
    }
    // Codes become file and directory names.
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid(format!("code {code:?} is not filename-safe")));
    }
    if !(spec.url.starts_with("http://") || spec.url.starts_with("https://")) {
        return Err(invalid(format!("url {:?} is not http(s)", spec.url)));
    }
    if spec.schema_map.key.is_empty() {
        return Err(invalid(s!("schema_map.key must name at least one column")));
    }
    Ok(())
}
