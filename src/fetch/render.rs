// src/fetch/render.rs
//
// Rendered-page variant: the holdings table only exists after client-side
// script runs, so drive headless Chromium, then poll the DOM until the
// candidate table is populated and its row count stops moving.

use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::FetchKind;
use crate::params::{RENDER_POLL_MILLIS, USER_AGENT};
use crate::table::RawTable;

use super::extract;

pub fn fetch(url: &str, timeout: Duration) -> Result<RawTable, FetchKind> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        // Keep the browser alive past our own deadline so teardown is ours.
        .idle_browser_timeout(timeout + Duration::from_secs(30))
        .build()
        .map_err(|e| FetchKind::Browser(anyhow::anyhow!("launch options: {e}")))?;

    let browser = Browser::new(options).map_err(FetchKind::Browser)?;
    let tab = browser.new_tab().map_err(FetchKind::Browser)?;
    tab.set_user_agent(USER_AGENT, None, None)
        .map_err(FetchKind::Browser)?;
    tab.navigate_to(url).map_err(FetchKind::Browser)?;
    tab.wait_until_navigated().map_err(FetchKind::Browser)?;

    let html = wait_for_stable_table(&tab, timeout)?;
    extract::raw_table_from_doc(&html)
}

/// Bounded wait: the table counts as settled once two consecutive polls
/// see the same non-zero row count. Never settling within `timeout` fails
/// this instrument only.
fn wait_for_stable_table(tab: &Tab, timeout: Duration) -> Result<String, FetchKind> {
    let started = Instant::now();
    let poll = Duration::from_millis(RENDER_POLL_MILLIS);
    let mut last_rows = 0usize;

    loop {
        let html = tab.get_content().map_err(FetchKind::Browser)?;
        let rows = extract::best_table_row_count(&html);
        if rows > 0 && rows == last_rows {
            return Ok(html);
        }
        last_rows = rows;

        if started.elapsed() + poll > timeout {
            return Err(FetchKind::RenderTimeout {
                secs: timeout.as_secs(),
            });
        }
        std::thread::sleep(poll);
    }
}
