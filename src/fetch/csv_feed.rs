// src/fetch/csv_feed.rs
//
// CSV-feed variant: some managers publish the portfolio as a plain CSV
// download. First row is the header; every data row must match its width.

use crate::csv::parse_rows;
use crate::error::FetchKind;
use crate::table::RawTable;

pub fn fetch(url: &str) -> Result<RawTable, FetchKind> {
    let body = super::http_get(url)?;
    parse(&body)
}

pub fn parse(text: &str) -> Result<RawTable, FetchKind> {
    let mut rows = parse_rows(text, ',');
    if rows.is_empty() {
        return Err(FetchKind::NoColumns);
    }
    let columns = rows.remove(0);
    // CSV feeds never state an as-of date in-band.
    RawTable::checked(columns, rows, None)
}
