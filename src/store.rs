// src/store.rs
//
// Date-stamped snapshot persistence: one JSON file per (instrument, date)
// under <root>/snapshots/<code>/<YYYY-MM-DD>.json. Files are named by
// logical data_date, so lineage queries go by filename and survive
// backfills written out of chronological order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::StoreError;
use crate::params::SNAPSHOTS_SUBDIR;
use crate::snapshot::Snapshot;

pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        SnapshotStore {
            root: out_root.into(),
        }
    }

    fn instrument_dir(&self, code: &str) -> PathBuf {
        self.root.join(SNAPSHOTS_SUBDIR).join(code)
    }

    fn snapshot_path(&self, code: &str, date: NaiveDate) -> PathBuf {
        self.instrument_dir(code)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Idempotent upsert keyed by (code, data_date). A re-run on the same
    /// day overwrites; history for other dates is never touched. The write
    /// goes to a temp file first so a crash leaves the prior file intact.
    pub fn write(&self, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        let path = self.snapshot_path(&snapshot.code, snapshot.data_date);
        crate::publish::write_json_atomic(&path, snapshot)?;
        debug!(code = %snapshot.code, date = %snapshot.data_date, "snapshot written");
        Ok(path)
    }

    /// All snapshot dates for an instrument, ascending. Missing directory
    /// means no history yet: an empty list, not an error.
    pub fn dates(&self, code: &str) -> Result<Vec<NaiveDate>, StoreError> {
        let dir = self.instrument_dir(code);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            // Stray files that aren't date-named are not snapshots.
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                dates.push(date);
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    pub fn read(&self, code: &str, date: NaiveDate) -> Result<Option<Snapshot>, StoreError> {
        let path = self.snapshot_path(code, date);
        if !path.exists() {
            return Ok(None);
        }
        load_snapshot(&path).map(Some)
    }

    pub fn read_latest(&self, code: &str) -> Result<Option<Snapshot>, StoreError> {
        match self.dates(code)?.last() {
            Some(&date) => self.read(code, date),
            None => Ok(None),
        }
    }

    /// Snapshot with the greatest data_date strictly before `date`. None on
    /// first run, the expected no-baseline state, not an error.
    pub fn read_prior_to(
        &self,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<Snapshot>, StoreError> {
        let prior = self
            .dates(code)?
            .into_iter()
            .filter(|&d| d < date)
            .next_back();
        match prior {
            Some(d) => self.read(code, d),
            None => Ok(None),
        }
    }
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
