// src/diff.rs
//
// Field-level diff of two snapshots of the same instrument. Classification
// is over row keys: added / removed / changed / unchanged, with old and new
// values recorded per differing field. Output order is fixed (added,
// removed, changed, unchanged; key-ascending within each group) so reports
// are reproducible and diffable as history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DiffInputError;
use crate::snapshot::{Snapshot, SnapshotRow};
use crate::table::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl ChangeStatus {
    fn rank(self) -> u8 {
        match self {
            ChangeStatus::Added => 0,
            ChangeStatus::Removed => 1,
            ChangeStatus::Changed => 2,
            ChangeStatus::Unchanged => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.changed + self.unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub column: String,
    pub old: Value,
    pub new: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub key: String,
    pub status: ChangeStatus,
    /// Populated for `changed` rows only: every differing field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldChange>,
}

/// `base_date` is the newer side, `compare_date` the older. Both null (and
/// `no_baseline` set) when there was no prior snapshot to compare
/// against, which the view must render distinctly from "zero real changes".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub code: String,
    pub base_date: Option<NaiveDate>,
    pub compare_date: Option<NaiveDate>,
    #[serde(default)]
    pub no_baseline: bool,
    pub columns: Vec<String>,
    pub summary: Summary,
    pub rows: Vec<ChangeRow>,
}

/// First-run report: no prior snapshot, so nothing is added or removed;
/// there is simply no baseline.
pub fn no_baseline(newer: &Snapshot) -> ChangeReport {
    ChangeReport {
        code: newer.code.clone(),
        base_date: Some(newer.data_date),
        compare_date: None,
        no_baseline: true,
        columns: compared_columns(newer, newer),
        summary: Summary::default(),
        rows: Vec::new(),
    }
}

pub fn diff(older: &Snapshot, newer: &Snapshot) -> Result<ChangeReport, DiffInputError> {
    if older.code != newer.code {
        return Err(DiffInputError {
            left: older.code.clone(),
            right: newer.code.clone(),
        });
    }

    let old_map = older.keyed_rows();
    let new_map = newer.keyed_rows();
    let columns = compared_columns(older, newer);

    let mut rows = Vec::with_capacity(old_map.len().max(new_map.len()));
    let mut summary = Summary::default();

    // Union of both key sets; BTreeMaps keep it sorted already.
    let keys: Vec<&String> = {
        let mut k: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
        k.sort();
        k.dedup();
        k
    };

    for key in keys {
        match (old_map.get(key), new_map.get(key)) {
            (None, Some(_)) => {
                summary.added += 1;
                rows.push(ChangeRow {
                    key: key.clone(),
                    status: ChangeStatus::Added,
                    fields: Vec::new(),
                });
            }
            (Some(_), None) => {
                summary.removed += 1;
                rows.push(ChangeRow {
                    key: key.clone(),
                    status: ChangeStatus::Removed,
                    fields: Vec::new(),
                });
            }
            (Some(old_row), Some(new_row)) => {
                let fields = changed_fields(old_row, new_row, &columns);
                let status = if fields.is_empty() {
                    summary.unchanged += 1;
                    ChangeStatus::Unchanged
                } else {
                    summary.changed += 1;
                    ChangeStatus::Changed
                };
                rows.push(ChangeRow {
                    key: key.clone(),
                    status,
                    fields,
                });
            }
            (None, None) => unreachable!("key came from one of the maps"),
        }
    }

    rows.sort_by(|a, b| (a.status.rank(), &a.key).cmp(&(b.status.rank(), &b.key)));

    Ok(ChangeReport {
        code: newer.code.clone(),
        base_date: Some(newer.data_date),
        compare_date: Some(older.data_date),
        no_baseline: false,
        columns,
        summary,
        rows,
    })
}

/// Canonical columns present on both sides, minus either side's key
/// columns, in the newer snapshot's order. Columns that only one snapshot
/// carries (schema drift) are not compared.
fn compared_columns(older: &Snapshot, newer: &Snapshot) -> Vec<String> {
    newer
        .columns
        .iter()
        .filter(|c| older.columns.contains(c))
        .filter(|c| !newer.key_columns.contains(c) && !older.key_columns.contains(c))
        .cloned()
        .collect()
}

fn changed_fields(
    old_row: &SnapshotRow,
    new_row: &SnapshotRow,
    columns: &[String],
) -> Vec<FieldChange> {
    let mut out = Vec::new();
    for col in columns {
        let old = old_row.get(col).cloned().unwrap_or(Value::Null);
        let new = new_row.get(col).cloned().unwrap_or(Value::Null);
        if !value_eq(&old, &new) {
            out.push(FieldChange {
                column: col.clone(),
                old,
                new,
            });
        }
    }
    out
}

/// Exact-equality after coercion. Numbers compare as numbers even when one
/// side is still a numeric-looking string, so formatting artifacts like
/// `"1,234"` vs `1234` or `"12.00"` vs `12` never show up as changes.
/// No tolerance: coerced values must be exactly equal.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => {
            if x == y {
                return true;
            }
            match (a.as_number(), b.as_number()) {
                (Some(p), Some(q)) => p == q,
                _ => false,
            }
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(p), Some(q)) => p == q,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn snap(date: &str, rows: Vec<Vec<(&str, Value)>>) -> Snapshot {
        Snapshot {
            code: s!("0050"),
            source_url: s!("https://example.com"),
            data_date: date.parse().unwrap(),
            scraped_at: DateTime::parse_from_rfc3339("2025-08-06T18:00:00+08:00").unwrap(),
            columns: vec![s!("ticker"), s!("qty")],
            key_columns: vec![s!("ticker")],
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
                .collect(),
        }
    }

    fn row(key: &str, qty: Value) -> Vec<(&'static str, Value)> {
        vec![("ticker", Value::Text(key.to_string())), ("qty", qty)]
    }

    #[test]
    fn scenario_add_remove_change() {
        let day1 = snap(
            "2025-08-05",
            vec![row("A", Value::Number(100.0)), row("B", Value::Number(50.0))],
        );
        let day2 = snap(
            "2025-08-06",
            vec![row("A", Value::Number(120.0)), row("C", Value::Number(10.0))],
        );

        let report = diff(&day1, &day2).unwrap();
        assert_eq!(
            report.summary,
            Summary { added: 1, removed: 1, changed: 1, unchanged: 0 }
        );
        assert_eq!(report.base_date, Some("2025-08-06".parse().unwrap()));
        assert_eq!(report.compare_date, Some("2025-08-05".parse().unwrap()));
        assert!(!report.no_baseline);

        // added, removed, changed, unchanged, in that order
        assert_eq!(report.rows[0].key, "C");
        assert_eq!(report.rows[0].status, ChangeStatus::Added);
        assert_eq!(report.rows[1].key, "B");
        assert_eq!(report.rows[1].status, ChangeStatus::Removed);
        assert_eq!(report.rows[2].key, "A");
        assert_eq!(report.rows[2].status, ChangeStatus::Changed);
        assert_eq!(
            report.rows[2].fields,
            vec![FieldChange {
                column: s!("qty"),
                old: Value::Number(100.0),
                new: Value::Number(120.0),
            }]
        );
    }

    #[test]
    fn completeness_invariant() {
        let a = snap(
            "2025-08-05",
            vec![row("A", Value::Number(1.0)), row("B", Value::Number(2.0))],
        );
        let b = snap(
            "2025-08-06",
            vec![
                row("B", Value::Number(2.0)),
                row("C", Value::Number(3.0)),
                row("D", Value::Number(4.0)),
            ],
        );
        let report = diff(&a, &b).unwrap();
        let union: std::collections::BTreeSet<_> = a
            .keyed_rows()
            .into_keys()
            .chain(b.keyed_rows().into_keys())
            .collect();
        assert_eq!(report.summary.total(), union.len());
        assert_eq!(report.rows.len(), union.len());
    }

    #[test]
    fn numeric_equivalence_is_unchanged() {
        // "1,234" as leftover text vs 1234 coerced: formatting artifact,
        // not a change.
        let a = snap("2025-08-05", vec![row("A", Value::Text(s!("1,234")))]);
        let b = snap("2025-08-06", vec![row("A", Value::Number(1234.0))]);
        let report = diff(&a, &b).unwrap();
        assert_eq!(report.summary.unchanged, 1);
        assert_eq!(report.summary.changed, 0);
    }

    #[test]
    fn trailing_zero_formatting_is_unchanged() {
        let a = snap("2025-08-05", vec![row("A", Value::Text(s!("12.00")))]);
        let b = snap("2025-08-06", vec![row("A", Value::Number(12.0))]);
        assert_eq!(diff(&a, &b).unwrap().summary.unchanged, 1);
    }

    #[test]
    fn null_to_value_is_a_change() {
        let a = snap("2025-08-05", vec![row("A", Value::Null)]);
        let b = snap("2025-08-06", vec![row("A", Value::Number(5.0))]);
        let report = diff(&a, &b).unwrap();
        assert_eq!(report.summary.changed, 1);
        assert_eq!(report.rows[0].fields[0].old, Value::Null);
    }

    #[test]
    fn unkeyed_rows_are_unclassifiable() {
        let a = snap("2025-08-05", vec![row("", Value::Number(1.0))]);
        let b = snap("2025-08-06", vec![row("", Value::Number(2.0))]);
        let report = diff(&a, &b).unwrap();
        assert_eq!(report.summary.total(), 0);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn add_remove_symmetry() {
        let a = snap(
            "2025-08-05",
            vec![row("A", Value::Number(1.0)), row("B", Value::Number(2.0))],
        );
        let b = snap("2025-08-06", vec![row("B", Value::Number(2.0)), row("C", Value::Number(3.0))]);
        let fwd = diff(&a, &b).unwrap();
        let rev = diff(&b, &a).unwrap();
        assert_eq!(fwd.summary.added, rev.summary.removed);
        assert_eq!(fwd.summary.removed, rev.summary.added);
    }

    #[test]
    fn no_baseline_is_flagged_not_counted() {
        let b = snap("2025-08-06", vec![row("A", Value::Number(1.0))]);
        let report = no_baseline(&b);
        assert!(report.no_baseline);
        assert_eq!(report.summary.total(), 0);
        assert_eq!(report.compare_date, None);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn mismatched_codes_are_rejected() {
        let a = snap("2025-08-05", vec![]);
        let mut b = snap("2025-08-06", vec![]);
        b.code = s!("0056");
        let err = diff(&a, &b).unwrap_err();
        assert_eq!(err.left, "0050");
        assert_eq!(err.right, "0056");
    }

    #[test]
    fn drifted_columns_are_not_compared() {
        let mut a = snap("2025-08-05", vec![row("A", Value::Number(1.0))]);
        a.columns = vec![s!("ticker"), s!("qty"), s!("old_only")];
        let b = snap("2025-08-06", vec![row("A", Value::Number(1.0))]);
        let report = diff(&a, &b).unwrap();
        assert_eq!(report.columns, vec![s!("qty")]);
        assert_eq!(report.summary.unchanged, 1);
    }

    #[test]
    fn report_groups_sorted_by_key() {
        let a = snap("2025-08-05", vec![row("B", Value::Number(1.0)), row("D", Value::Number(1.0))]);
        let b = snap(
            "2025-08-06",
            vec![row("C", Value::Number(1.0)), row("A", Value::Number(1.0))],
        );
        let report = diff(&a, &b).unwrap();
        let order: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
        // added A,C then removed B,D
        assert_eq!(order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeStatus::Added).unwrap();
        assert_eq!(json, r#""added""#);
    }
}
