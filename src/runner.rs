// src/runner.rs
//
// Per-run orchestration. Instruments share no mutable state and are
// processed independently: any per-instrument error is logged, recorded
// in the summary, and the loop moves on. Only a broken descriptor file
// aborts the whole run.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::diff;
use crate::error::PipelineError;
use crate::fetch::{self, FetchOptions};
use crate::normalize;
use crate::params::TZ_OFFSET_HOURS;
use crate::publish::Publisher;
use crate::snapshot::Snapshot;
use crate::sources::{self, SourceSpec};
use crate::store::SnapshotStore;
use crate::table::RawTable;

pub struct RunOptions {
    pub sources_file: PathBuf,
    pub out_root: PathBuf,
    /// Restrict the run to these codes; None runs every configured one.
    pub only: Option<Vec<String>>,
    pub fetch: FetchOptions,
}

pub struct RunSummary {
    pub published: Vec<String>,
    pub failed: Vec<(String, PipelineError)>,
}

impl RunSummary {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn run(opts: &RunOptions) -> Result<RunSummary, PipelineError> {
    let specs = sources::load(&opts.sources_file)?;
    let store = SnapshotStore::new(&opts.out_root);
    let publisher = Publisher::new(&opts.out_root);

    let mut summary = RunSummary {
        published: Vec::new(),
        failed: Vec::new(),
    };

    for (code, spec) in &specs {
        if let Some(only) = &opts.only {
            if !only.iter().any(|c| c == code) {
                continue;
            }
        }
        match run_instrument(code, spec, &store, &publisher, &opts.fetch) {
            Ok(date) => {
                info!(code, date = %date, "instrument pipeline complete");
                summary.published.push(code.clone());
            }
            Err(e) => {
                error!(code, error = %crate::error::chain(&e), "instrument failed");
                summary.failed.push((code.clone(), e));
            }
        }
    }

    publisher.update_index(local_now())?;
    Ok(summary)
}

fn run_instrument(
    code: &str,
    spec: &SourceSpec,
    store: &SnapshotStore,
    publisher: &Publisher,
    fetch_opts: &FetchOptions,
) -> Result<NaiveDate, PipelineError> {
    let raw = fetch::fetch(code, spec, fetch_opts)?;
    process_raw(code, spec, raw, local_now(), store, publisher)
}

/// Everything after the fetch: normalize, snapshot, diff against the
/// most recent prior day, publish. Split out so tests drive the pipeline
/// with fixture tables instead of live sources.
pub fn process_raw(
    code: &str,
    spec: &SourceSpec,
    raw: RawTable,
    now: DateTime<FixedOffset>,
    store: &SnapshotStore,
    publisher: &Publisher,
) -> Result<NaiveDate, PipelineError> {
    let table = normalize::normalize(code, &raw, &spec.schema_map)?;

    let unkeyed = table.rows.iter().filter(|r| r.key.is_none()).count();
    if unkeyed > 0 {
        warn!(code, unkeyed, "rows without a key are excluded from keyed diffing");
    }

    // Page-stated as-of date wins; otherwise attribute the run's local
    // calendar day (matters near midnight, hence the fixed market offset).
    let data_date = raw.data_date.unwrap_or_else(|| now.date_naive());
    let snapshot = Snapshot::build(code, &spec.url, data_date, now, &table);
    store.write(&snapshot)?;

    let report = match store.read_prior_to(code, data_date)? {
        Some(older) => {
            if older.key_columns != snapshot.key_columns {
                // Descriptor drift (e.g. source type switched mid-history).
                // Snapshots are schema-versioned per date; no cross-scheme
                // reconciliation is attempted.
                warn!(
                    code,
                    prior = %older.data_date,
                    "key scheme changed since prior snapshot (configuration change)"
                );
            }
            diff::diff(&older, &snapshot)?
        }
        None => diff::no_baseline(&snapshot),
    };

    publisher.publish(&snapshot, &report)?;
    Ok(data_date)
}

/// Now, in the market-local fixed offset.
pub fn local_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(TZ_OFFSET_HOURS * 3600).expect("offset in range");
    Utc::now().with_timezone(&offset)
}
