// src/normalize.rs
//
// Row Normalizer: apply one instrument's declared schema map to a raw
// table: canonical column names, typed cells, and a stable row key per
// row. Identity must survive immaterial upstream formatting drift
// (whitespace, case, thousand separators), so keys are normalized hard.

use crate::core::sanitize::normalize_ws;
use crate::error::{SchemaError, SchemaKind};
use crate::sources::SchemaMap;
use crate::table::{RawTable, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    /// Canonical key columns, recorded so snapshots stay keyable after the
    /// live schema map drifts.
    pub key_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// None when any key cell is blank. Such rows stay in the table but
    /// are never matched across snapshots.
    pub key: Option<String>,
    /// Aligned with `NormalizedTable::columns`.
    pub cells: Vec<Value>,
}

pub fn normalize(
    code: &str,
    raw: &RawTable,
    map: &SchemaMap,
) -> Result<NormalizedTable, SchemaError> {
    let fail = |kind: SchemaKind| SchemaError {
        code: code.to_string(),
        kind,
    };

    if map.key.is_empty() {
        return Err(fail(SchemaKind::EmptyKey));
    }

    // Canonical header: rename on the whitespace-normalized raw name,
    // unmapped headers pass through normalized.
    let mut columns = Vec::with_capacity(raw.columns.len());
    for raw_name in &raw.columns {
        let cleaned = normalize_ws(raw_name);
        let canonical = map.rename.get(&cleaned).cloned().unwrap_or(cleaned);
        if columns.contains(&canonical) {
            return Err(fail(SchemaKind::DuplicateColumn(canonical)));
        }
        columns.push(canonical);
    }

    for name in &map.required {
        if !columns.contains(name) {
            return Err(fail(SchemaKind::MissingRequired(name.clone())));
        }
    }
    let mut key_idx = Vec::with_capacity(map.key.len());
    for name in &map.key {
        match columns.iter().position(|c| c == name) {
            Some(i) => key_idx.push(i),
            None => return Err(fail(SchemaKind::MissingKey(name.clone()))),
        }
    }

    let rows = raw
        .rows
        .iter()
        .map(|raw_row| NormalizedRow {
            key: derive_key(raw_row, &key_idx),
            cells: coerce_row(raw_row, &columns, map),
        })
        .collect();

    Ok(NormalizedTable {
        columns,
        rows,
        key_columns: map.key.clone(),
    })
}

fn coerce_row(raw_row: &[String], columns: &[String], map: &SchemaMap) -> Vec<Value> {
    columns
        .iter()
        .zip(raw_row)
        .map(|(col, cell)| {
            if map.percent.contains(col) {
                match parse_number(cell) {
                    Some(n) if map.percent_as_fraction => Value::Number(n / 100.0),
                    Some(n) => Value::Number(n),
                    None => Value::Null,
                }
            } else if map.numeric.contains(col) {
                parse_number(cell).map_or(Value::Null, Value::Number)
            } else {
                let t = normalize_ws(cell);
                if t.is_empty() { Value::Null } else { Value::Text(t) }
            }
        })
        .collect()
}

/// Numeric coercion shared with the diff engine: trim, drop thousand
/// separators and percent signs, then parse. Anything else is not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let t: String = s
        .trim()
        .chars()
        .filter(|&c| c != ',' && c != '%')
        .collect();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Row key: normalized key cells joined with `|`. Blank part ⇒ no key.
pub fn derive_key(raw_row: &[String], key_idx: &[usize]) -> Option<String> {
    let mut parts = Vec::with_capacity(key_idx.len());
    for &i in key_idx {
        let part = key_part(raw_row.get(i)?);
        if part.is_empty() {
            return None;
        }
        parts.push(part);
    }
    Some(parts.join("|"))
}

/// Normalization applied to each key cell: collapse whitespace, drop
/// thousand separators, ASCII-uppercase.
pub fn key_part(s: &str) -> String {
    normalize_ws(s)
        .chars()
        .filter(|&c| c != ',')
        .map(|c| if c.is_ascii() { c.to_ascii_uppercase() } else { c })
        .collect()
}
