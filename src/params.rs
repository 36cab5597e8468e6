// src/params.rs

// Output layout, relative to the output root (--out, default "data").
pub const DEFAULT_OUT_DIR: &str = "data";
pub const SNAPSHOTS_SUBDIR: &str = "snapshots";
pub const CURRENT_SUBDIR: &str = "current";
pub const CHANGES_SUBDIR: &str = "changes";
pub const INDEX_FILENAME: &str = "index.json";

pub const DEFAULT_SOURCES_FILE: &str = "sources.json";

/// Desktop UA: some fund-manager sites serve bot UAs a stripped page.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Market-local offset (UTC+8). Governs `scraped_at` and the fallback
/// `data_date` when a page does not state one.
pub const TZ_OFFSET_HOURS: i32 = 8;

/// Rendered-page deadline. Holdings tables can take several seconds of
/// client-side script before the DOM settles.
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Poll interval while waiting for a rendered table to go stable.
pub const RENDER_POLL_MILLIS: u64 = 1_000;

/// HTTP deadline for the static-page and CSV variants.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Fetch attempts per instrument before the error is surfaced.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 2;
