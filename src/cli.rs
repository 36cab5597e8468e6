// src/cli.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::fetch::FetchOptions;
use crate::params::{
    DEFAULT_FETCH_ATTEMPTS, DEFAULT_OUT_DIR, DEFAULT_SOURCES_FILE, DEFAULT_TIMEOUT_SECS,
};
use crate::runner::{self, RunOptions};
use crate::sources;

#[derive(Debug, Parser)]
#[command(name = "holdwatch", version, about = "Scrape ETF holdings, snapshot them, diff against the prior day")]
pub struct Cli {
    /// Source descriptor file (JSON map of code → {type, url, schema_map})
    #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
    pub sources: PathBuf,

    /// Output root for snapshots and published artifacts
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Only process these instrument codes
    #[arg(long, value_delimiter = ',', value_name = "CODE,...")]
    pub only: Option<Vec<String>>,

    /// Rendered-page deadline in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Fetch attempts per instrument before giving up
    #[arg(long, default_value_t = DEFAULT_FETCH_ATTEMPTS)]
    pub attempts: u32,

    /// List configured instrument codes and exit
    #[arg(long)]
    pub list: bool,
}

/// Returns the process exit code: non-zero when any instrument failed,
/// while the others' artifacts are still published.
pub fn run(cli: Cli) -> color_eyre::Result<i32> {
    if cli.list {
        for code in sources::load(&cli.sources)?.keys() {
            println!("{code}");
        }
        return Ok(0);
    }

    let opts = RunOptions {
        sources_file: cli.sources,
        out_root: cli.out,
        only: cli.only,
        fetch: FetchOptions {
            timeout: Duration::from_secs(cli.timeout_secs),
            attempts: cli.attempts,
        },
    };

    let summary = runner::run(&opts)?;
    println!(
        "published {} instrument(s), {} failed",
        summary.published.len(),
        summary.failed.len()
    );
    for (code, err) in &summary.failed {
        eprintln!("  {code}: {}", crate::error::chain(err));
    }
    Ok(if summary.all_ok() { 0 } else { 1 })
}
