// src/fetch/extract.rs
//
// Shared HTML extraction for the render and html variants: pick the
// holdings table out of a page full of layout tables, and recover the
// as-of date the page states.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::core::html::{extract_tables, strip_tags, TableBlock};
use crate::error::FetchKind;
use crate::table::RawTable;

// Header keywords that mark a constituent-holdings table, across the
// managers we track. Scored per set; the best single set wins.
const KEYWORD_SETS: &[&[&str]] = &[
    &["代號", "名稱", "比重"],
    &["股票代號", "股票名稱", "比重"],
    &["Ticker", "Name", "Weight"],
    &["代碼", "名稱", "權重"],
];

/// Keyword hits dominate, then row count, then column count: the page's
/// biggest keyword-matching table is the holdings table.
fn score(t: &TableBlock) -> usize {
    let joined = t.headers.join(" ");
    let mut hits = 0;
    for set in KEYWORD_SETS {
        let hit = set.iter().filter(|k| joined.contains(*k)).count();
        hits = hits.max(hit);
    }
    hits * 100_000 + t.rows.len() * 100 + t.headers.len()
}

pub fn best_holdings_table(doc: &str) -> Option<TableBlock> {
    extract_tables(doc).into_iter().max_by_key(score)
}

/// Row count of the table we would pick right now. Drives the rendered
/// page's stability wait.
pub fn best_table_row_count(doc: &str) -> usize {
    best_holdings_table(doc).map_or(0, |t| t.rows.len())
}

/// Full document → validated raw table + stated as-of date.
pub fn raw_table_from_doc(doc: &str) -> Result<RawTable, FetchKind> {
    let best = best_holdings_table(doc).ok_or(FetchKind::NoTable)?;
    let data_date = extract_data_date(&strip_tags(doc));
    RawTable::checked(best.headers, best.rows, data_date)
}

/// `資料日期: 2025/08/06`, `日期 2025-08-06`, `Data Date: 2025-08-06` …
pub fn extract_data_date(text: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(?:資料日期|日期|Data\s*Date)\s*[:：]?\s*(\d{4})[/-](\d{2})[/-](\d{2})")
            .expect("date pattern compiles")
    });
    let caps = re.captures(text)?;
    let y = caps[1].parse().ok()?;
    let m = caps[2].parse().ok()?;
    let d = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}
