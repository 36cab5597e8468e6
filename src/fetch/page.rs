// src/fetch/page.rs
//
// Static-page variant: the table is server-rendered, so one GET and the
// shared extractor do the whole job.

use crate::error::FetchKind;
use crate::table::RawTable;

use super::extract;

pub fn fetch(url: &str) -> Result<RawTable, FetchKind> {
    let body = super::http_get(url)?;
    extract::raw_table_from_doc(&body)
}
