// src/snapshot.rs
//
// Immutable captured holdings table for one instrument on one logical
// date. The serialized form IS the published "current" contract:
// {code, source_url, data_date, scraped_at, columns, rows, key_columns}.
// `key_columns` freezes the key scheme as of that date, so a snapshot
// written under an older schema map stays diffable after config drift.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedTable;
use crate::table::Value;

pub type SnapshotRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: String,
    pub source_url: String,
    pub data_date: NaiveDate,
    pub scraped_at: DateTime<FixedOffset>,
    /// Canonical column order; row objects are unordered JSON maps.
    pub columns: Vec<String>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn build(
        code: &str,
        source_url: &str,
        data_date: NaiveDate,
        scraped_at: DateTime<FixedOffset>,
        table: &NormalizedTable,
    ) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|r| {
                table
                    .columns
                    .iter()
                    .cloned()
                    .zip(r.cells.iter().cloned())
                    .collect()
            })
            .collect();
        Snapshot {
            code: code.to_string(),
            source_url: source_url.to_string(),
            data_date,
            scraped_at,
            columns: table.columns.clone(),
            key_columns: table.key_columns.clone(),
            rows,
        }
    }

    /// Key for one stored row under this snapshot's own key scheme.
    /// None when any key cell is null or blank; such rows are never
    /// matched across snapshots.
    pub fn row_key(&self, row: &SnapshotRow) -> Option<String> {
        let mut parts = Vec::with_capacity(self.key_columns.len());
        for col in &self.key_columns {
            let part = match row.get(col)? {
                Value::Text(t) => crate::normalize::key_part(t),
                Value::Number(n) => fmt_key_number(*n),
                Value::Null => return None,
            };
            if part.is_empty() {
                return None;
            }
            parts.push(part);
        }
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("|"))
    }

    /// Keyed view of the rows. Later duplicate keys win, matching the
    /// upstream table's own precedence; the full `rows` keeps everything.
    pub fn keyed_rows(&self) -> BTreeMap<String, &SnapshotRow> {
        let mut map = BTreeMap::new();
        for row in &self.rows {
            if let Some(key) = self.row_key(row) {
                map.insert(key, row);
            }
        }
        map
    }
}

/// Integral keys print without a fraction so `2330` and `2330.0` collide
/// on purpose.
fn fmt_key_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}
