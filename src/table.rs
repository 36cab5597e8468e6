// src/table.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchKind;

/// One canonical table cell. Untagged so cells publish as native JSON
/// scalars (`null`, number, string) in every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the cell, parsing numeric-looking text. Used by the
    /// diff engine so `"1,234"` and `1234` compare equal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(t) => crate::normalize::parse_number(t),
            Value::Null => None,
        }
    }
}

/// Fixed output shape of every source adapter: raw header strings plus raw
/// cell strings, one `Vec` per row, all the same width as the header.
/// `data_date` is the as-of date stated on the page, when one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub data_date: Option<NaiveDate>,
}

impl RawTable {
    /// Validate shape on the way out of an adapter. Zero columns or a
    /// width-mismatched row is a malformed table; zero *rows* is fine.
    pub fn checked(
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        data_date: Option<NaiveDate>,
    ) -> Result<Self, FetchKind> {
        if columns.is_empty() {
            return Err(FetchKind::NoColumns);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(FetchKind::RowWidth {
                    row: i,
                    want: columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(RawTable { columns, rows, data_date })
    }
}
