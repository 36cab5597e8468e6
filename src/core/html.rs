// src/core/html.rs

use super::sanitize::{clean_cell, normalize_ws};

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Find the next `<o ...> ... </c>` block at or after `from`.
/// Returns byte offsets of the whole block, close tag included.
pub fn next_tag_block_ci(s: &str, o: &str, c: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lower(s);
    let ol = to_lower(o);
    let cl = to_lower(c);
    let start = lc.get(from..)?.find(&ol)? + from;
    let open_end = s[start..].find('>')? + start + 1;
    let end_rel = lc[open_end..].find(&cl)?;
    let end = open_end + end_rel + c.len();
    Some((start, end))
}

pub fn inner_after_open_tag(block: &str) -> String {
    if let Some(oe) = block.find('>') {
        if let Some(cs) = block.rfind('<') {
            if cs > oe {
                return block[oe + 1..cs].to_string();
            }
        }
    }
    s!()
}

pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();

    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&out)
}

/// One `<table>` as raw header + body cell text, markup stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Every table in the document, in document order.
/// Nested tables truncate at the first close tag; holdings tables are
/// leaf tables, so the inner table survives and the mangled outer one
/// loses the scoring later.
pub fn extract_tables(doc: &str) -> Vec<TableBlock> {
    let mut tables = Vec::new();
    let mut pos = 0usize;
    while let Some((t_s, t_e)) = next_tag_block_ci(doc, "<table", "</table>", pos) {
        let table = &doc[t_s..t_e];
        pos = t_e;
        if let Some(block) = extract_one_table(table) {
            tables.push(block);
        }
    }
    tables
}

fn extract_one_table(table: &str) -> Option<TableBlock> {
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    let mut pos = 0usize;
    while let Some((tr_s, tr_e)) = next_tag_block_ci(table, "<tr", "</tr>", pos) {
        let tr = &table[tr_s..tr_e];
        pos = tr_e;

        let ths = read_cells(tr, "<th", "</th>");
        let tds = read_cells(tr, "<td", "</td>");

        if headers.is_empty() && !ths.is_empty() {
            headers = ths;
            continue;
        }
        if tds.is_empty() {
            continue;
        }
        // Single-cell rows inside a wider table are section banners
        // (colspan), not data.
        if headers.len() > 1 && tds.len() == 1 {
            continue;
        }
        rows.push(tds);
    }

    // Headerless tables: promote the first data row.
    if headers.is_empty() {
        if rows.is_empty() {
            return None;
        }
        headers = rows.remove(0);
    }

    Some(TableBlock { headers, rows })
}

fn read_cells(tr: &str, open: &str, close: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut pos = 0usize;
    while let Some((c_s, c_e)) = next_tag_block_ci(tr, open, close, pos) {
        let block = &tr[c_s..c_e];
        cells.push(clean_cell(&inner_after_open_tag(block)));
        pos = c_e;
    }
    cells
}
