// tests/pipeline_e2e.rs
//
// Drives the post-fetch pipeline end to end with fixture tables and
// checks the published artifacts against the output contract.

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use holdwatch::fetch::{parse_csv_feed, FetchOptions};
use holdwatch::publish::Publisher;
use holdwatch::runner::{self, process_raw, RunOptions};
use holdwatch::sources::{SchemaMap, SourceSpec, SourceType};
use holdwatch::store::SnapshotStore;
use holdwatch::table::RawTable;

fn at(ts: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(ts).unwrap()
}

fn spec() -> SourceSpec {
    SourceSpec {
        kind: SourceType::Csv,
        url: "https://example.com/holdings.csv".into(),
        schema_map: SchemaMap {
            rename: BTreeMap::from([
                ("Ticker".to_string(), "ticker".to_string()),
                ("Qty".to_string(), "qty".to_string()),
            ]),
            required: vec!["ticker".into()],
            key: vec!["ticker".into()],
            numeric: vec!["qty".into()],
            percent: vec![],
            percent_as_fraction: false,
        },
    }
}

fn raw(csv: &str, date: &str) -> RawTable {
    let mut t = parse_csv_feed(csv).unwrap();
    t.data_date = Some(date.parse().unwrap());
    t
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn two_day_run_publishes_contract_artifacts() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let publisher = Publisher::new(dir.path());
    let spec = spec();

    // Day 1: no baseline yet.
    process_raw(
        "0050",
        &spec,
        raw("Ticker,Qty\nA,100\nB,50\n", "2025-08-05"),
        at("2025-08-05T18:02:00+08:00"),
        &store,
        &publisher,
    )
    .unwrap();

    let current = read_json(&publisher.current_path("0050"));
    assert_eq!(current["data_date"], "2025-08-05");
    assert_eq!(current["columns"], serde_json::json!(["ticker", "qty"]));
    assert_eq!(current["rows"][0]["ticker"], "A");
    assert_eq!(current["rows"][0]["qty"], 100.0);

    let changes = read_json(&publisher.changes_path("0050"));
    assert_eq!(changes["no_baseline"], true);
    assert_eq!(changes["compare_date"], serde_json::Value::Null);
    assert_eq!(changes["summary"]["added"], 0);

    // Day 2: A changed, B removed, C added.
    process_raw(
        "0050",
        &spec,
        raw("Ticker,Qty\nA,120\nC,10\n", "2025-08-06"),
        at("2025-08-06T18:02:00+08:00"),
        &store,
        &publisher,
    )
    .unwrap();

    let current = read_json(&publisher.current_path("0050"));
    assert_eq!(current["data_date"], "2025-08-06");

    let changes = read_json(&publisher.changes_path("0050"));
    assert_eq!(changes["no_baseline"], false);
    assert_eq!(changes["base_date"], "2025-08-06");
    assert_eq!(changes["compare_date"], "2025-08-05");
    assert_eq!(changes["summary"]["added"], 1);
    assert_eq!(changes["summary"]["removed"], 1);
    assert_eq!(changes["summary"]["changed"], 1);
    assert_eq!(changes["summary"]["unchanged"], 0);

    let rows = changes["rows"].as_array().unwrap();
    assert_eq!(rows[0]["key"], "C");
    assert_eq!(rows[0]["status"], "added");
    assert_eq!(rows[1]["key"], "B");
    assert_eq!(rows[1]["status"], "removed");
    assert_eq!(rows[2]["key"], "A");
    assert_eq!(rows[2]["status"], "changed");
    assert_eq!(rows[2]["fields"][0]["column"], "qty");
    assert_eq!(rows[2]["fields"][0]["old"], 100.0);
    assert_eq!(rows[2]["fields"][0]["new"], 120.0);

    let index = publisher.update_index(at("2025-08-06T18:03:00+08:00")).unwrap();
    assert_eq!(index.codes, vec!["0050"]);
    let on_disk = read_json(&publisher.index_path());
    assert_eq!(on_disk["codes"], serde_json::json!(["0050"]));
}

#[test]
fn one_bad_instrument_does_not_block_the_others() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let publisher = Publisher::new(dir.path());

    // BBB's descriptor requires a column its feed does not carry.
    let good = spec();
    let mut bad = spec();
    bad.schema_map.required.push("weight".into());

    let now = at("2025-08-06T18:02:00+08:00");
    let csv = "Ticker,Qty\nA,1\n";

    let mut failed = Vec::new();
    let mut published = Vec::new();
    for (code, s) in [("AAA", &good), ("BBB", &bad), ("CCC", &good)] {
        match process_raw(code, s, raw(csv, "2025-08-06"), now, &store, &publisher) {
            Ok(_) => published.push(code),
            Err(e) => failed.push((code, e)),
        }
    }

    assert_eq!(published, vec!["AAA", "CCC"]);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "BBB");
    assert!(holdwatch::error::chain(&failed[0].1).contains("weight"));

    assert!(publisher.current_path("AAA").exists());
    assert!(publisher.current_path("CCC").exists());
    assert!(!publisher.current_path("BBB").exists());

    let index = publisher.update_index(now).unwrap();
    assert_eq!(index.codes, vec!["AAA", "CCC"]);
}

#[test]
fn run_reports_unreachable_source_without_aborting() {
    let dir = TempDir::new().unwrap();

    // Closed port: the fetch fails fast, the run completes and says so.
    let sources = r#"{
      "XXX": {
        "type": "csv",
        "url": "http://127.0.0.1:1/holdings.csv",
        "schema_map": {"key": ["ticker"], "rename": {"Ticker": "ticker"}}
      }
    }"#;
    let sources_path = dir.path().join("sources.json");
    fs::write(&sources_path, sources).unwrap();

    let summary = runner::run(&RunOptions {
        sources_file: sources_path,
        out_root: dir.path().join("data"),
        only: None,
        fetch: FetchOptions {
            timeout: Duration::from_secs(1),
            attempts: 1,
        },
    })
    .unwrap();

    assert!(summary.published.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "XXX");
    assert!(!summary.all_ok());

    // The index is still written, empty, since nothing published.
    let index = read_json(&dir.path().join("data/current/index.json"));
    assert_eq!(index["codes"], serde_json::json!([]));
}

#[test]
fn rerun_same_day_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let publisher = Publisher::new(dir.path());
    let spec = spec();
    let now = at("2025-08-06T18:02:00+08:00");

    process_raw("0050", &spec, raw("Ticker,Qty\nA,1\n", "2025-08-06"), now, &store, &publisher)
        .unwrap();
    process_raw("0050", &spec, raw("Ticker,Qty\nA,1\n", "2025-08-06"), now, &store, &publisher)
        .unwrap();

    assert_eq!(store.dates("0050").unwrap().len(), 1);
    let snap = store.read_latest("0050").unwrap().unwrap();
    assert_eq!(snap.rows.len(), 1);
}
