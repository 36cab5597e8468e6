// src/publish.rs
//
// Publisher: the fixed output contract the view layer reads.
//
//   <root>/current/<code>.json    latest table
//   <root>/current/index.json     {codes, generated_at}
//   <root>/changes/<code>.json    latest change report
//
// Each artifact is written to a temp file and renamed into place. The
// changes artifact lands before current: a reader may briefly see an old
// table with a fresh report, but never a fresh table paired with a report
// describing two runs ago.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::diff::ChangeReport;
use crate::error::StoreError;
use crate::params::{CHANGES_SUBDIR, CURRENT_SUBDIR, INDEX_FILENAME};
use crate::snapshot::Snapshot;

/// Instrument enumeration for the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub codes: Vec<String>,
    pub generated_at: DateTime<FixedOffset>,
}

pub struct Publisher {
    root: PathBuf,
}

impl Publisher {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Publisher {
            root: out_root.into(),
        }
    }

    pub fn current_path(&self, code: &str) -> PathBuf {
        self.root.join(CURRENT_SUBDIR).join(format!("{code}.json"))
    }

    pub fn changes_path(&self, code: &str) -> PathBuf {
        self.root.join(CHANGES_SUBDIR).join(format!("{code}.json"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(CURRENT_SUBDIR).join(INDEX_FILENAME)
    }

    pub fn publish(&self, snapshot: &Snapshot, report: &ChangeReport) -> Result<(), StoreError> {
        write_json_atomic(&self.changes_path(&snapshot.code), report)?;
        write_json_atomic(&self.current_path(&snapshot.code), snapshot)?;
        info!(code = %snapshot.code, date = %snapshot.data_date, "published");
        Ok(())
    }

    /// Rebuild index.json from the current tables actually on disk, so it
    /// only ever lists instruments a reader can load.
    pub fn update_index(&self, now: DateTime<FixedOffset>) -> Result<Index, StoreError> {
        let dir = self.root.join(CURRENT_SUBDIR);
        let mut codes = Vec::new();
        if dir.exists() {
            let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| StoreError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) if stem != "index" => codes.push(stem.to_string()),
                    _ => {}
                }
            }
        }
        codes.sort();

        let index = Index {
            codes,
            generated_at: now,
        };
        write_json_atomic(&self.index_path(), &index)?;
        Ok(index)
    }
}

/// Write-new-then-replace, never in-place mutation: serialize next to the
/// destination and rename over it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, text).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
