// src/utils/config.rs
use std::time::Duration;

/// Default archive host. All listing, feed and document URLs hang off it.
pub const DEFAULT_BASE_URL: &str = "https://www.sec.gov";

// SEC asks for a descriptive User-Agent with contact details.
pub const DEFAULT_USER_AGENT: &str = "thirteenf-extractor admin@example.com";

// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 150;

/// The output sink rejects records above roughly 9 MB.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 9_000_000;

pub const DEFAULT_INDEX_DELIMITER: char = '|';
pub const DEFAULT_FEED_PAGE_SIZE: usize = 100;
pub const DEFAULT_FEED_MAX_PAGES: usize = 20;

pub const ACCEPTED_FORM_TYPES: [&str; 4] = ["13F-HR", "13F-HR/A", "13F-NT", "13F-NT/A"];

/// Runtime settings shared by the crawl and the offline passes.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub request_delay: Duration,
    pub max_record_bytes: usize,
    pub index_delimiter: char,
    pub feed_page_size: usize,
    pub feed_max_pages: usize,
    pub accepted_form_types: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            index_delimiter: DEFAULT_INDEX_DELIMITER,
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
            feed_max_pages: DEFAULT_FEED_MAX_PAGES,
            accepted_form_types: ACCEPTED_FORM_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Base URL without a trailing slash, so paths can be appended with `format!`.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn accepts_form(&self, form_type: &str) -> bool {
        let form_type = form_type.trim();
        self.accepted_form_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(form_type))
    }
}
