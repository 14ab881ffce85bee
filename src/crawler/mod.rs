// src/crawler/mod.rs
//
// Drives filing assembly over a FIFO work queue. Each work item carries the
// URL to fetch next and the assembly state to fold its body into, so one
// filing's documents are visited in order while different filings
// interleave freely.
pub mod assembly;

use crate::edgar::client::Fetch;
use crate::edgar::feed::fetch_recent;
use crate::edgar::index::parse_index;
use crate::edgar::models::{Filing, Period};
use crate::edgar::normalize::{filing_from_feed_entry, filing_from_index_row};
use crate::storage::StorageManager;
use crate::utils::config::Settings;
use crate::utils::error::AppError;
use assembly::AssemblyState;
use chrono::{DateTime, FixedOffset};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub url: String,
    pub state: AssemblyState,
}

impl WorkItem {
    /// First item for a freshly discovered filing: its directory page.
    pub fn seed(filing: Filing) -> Self {
        Self {
            url: filing.directory_url.clone(),
            state: AssemblyState::new(filing),
        }
    }
}

/// Accepts work for later sequential processing.
pub trait Enqueue {
    fn enqueue(&mut self, items: Vec<WorkItem>);
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
}

impl WorkQueue {
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Enqueue for WorkQueue {
    fn enqueue(&mut self, items: Vec<WorkItem>) {
        self.items.extend(items);
    }
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CrawlSummary {
    pub filings_discovered: usize,
    pub documents_fetched: usize,
    pub filings_written: usize,
    /// (url, error) for every item that was dropped.
    pub failures: Vec<(String, String)>,
}

pub struct Crawler<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    storage: &'a StorageManager,
    settings: &'a Settings,
}

impl<'a, F: Fetch + ?Sized> Crawler<'a, F> {
    pub fn new(fetcher: &'a F, storage: &'a StorageManager, settings: &'a Settings) -> Self {
        Self {
            fetcher,
            storage,
            settings,
        }
    }

    /// 13F filing shells listed in one quarter's `master.idx`.
    pub async fn discover_quarter(&self, period: Period) -> Result<Vec<Filing>, AppError> {
        let url = period.master_index_url(self.settings.base());
        tracing::info!("Fetching {} listing: {}", period, url);

        let body = self.fetcher.fetch(&url).await?;
        let index = parse_index(&body, self.settings.index_delimiter)?;

        let mut filings = Vec::new();
        for row in &index.entries {
            match filing_from_index_row(row, self.settings) {
                Ok(Some(filing)) => filings.push(filing),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping listing row in {}: {}", period, e),
            }
        }
        tracing::info!(
            "{}: {} of {} listing rows are 13F filings",
            period,
            filings.len(),
            index.entries.len()
        );
        Ok(filings)
    }

    /// 13F filing shells from the recent-filings feed, one walk per accepted
    /// form type. A form type whose feed cannot be read is logged and skipped.
    pub async fn discover_recent(&self, cutoff: Option<DateTime<FixedOffset>>) -> Vec<Filing> {
        let mut seen = HashSet::new();
        let mut filings = Vec::new();

        for form_type in &self.settings.accepted_form_types {
            let entries = match fetch_recent(self.fetcher, self.settings, form_type, cutoff).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!("Failed to read {} feed: {}", form_type, e);
                    continue;
                }
            };
            for entry in &entries {
                let Some(filing) = filing_from_feed_entry(entry, self.settings) else {
                    continue;
                };
                if seen.insert(filing.external_id.clone()) {
                    filings.push(filing);
                }
            }
        }
        tracing::info!("Feed yielded {} distinct 13F filings", filings.len());
        filings
    }

    /// Processes the queue until it drains. Completed filings go to storage;
    /// a failed fetch, extraction or write drops that filing and is counted.
    pub async fn run(&self, queue: &mut WorkQueue) -> CrawlSummary {
        let mut summary = CrawlSummary {
            filings_discovered: queue.len(),
            ..CrawlSummary::default()
        };

        while let Some(WorkItem { url, state }) = queue.pop() {
            let external_id = state.filing.external_id.clone();

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("{}: failed to fetch {}: {}", external_id, url, e);
                    summary.failures.push((url, e.to_string()));
                    continue;
                }
            };
            summary.documents_fetched += 1;

            let state = match state.advance(&body) {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!("{}: extraction failed for {}: {}", external_id, url, e);
                    summary.failures.push((url, e.to_string()));
                    continue;
                }
            };

            match state.next_url().map(str::to_string) {
                Some(next) => queue.enqueue(vec![WorkItem { url: next, state }]),
                None => match self.storage.write_filing(&state.filing) {
                    Ok(paths) => {
                        tracing::info!(
                            "{}: complete after {} documents, {} file(s) written",
                            external_id,
                            state.visited_docs.len(),
                            paths.len()
                        );
                        summary.filings_written += 1;
                    }
                    Err(e) => {
                        tracing::error!("{}: failed to write record: {}", external_id, e);
                        summary.failures.push((url, e.to_string()));
                    }
                },
            }
        }

        tracing::info!(
            "Crawl finished: {} filings, {} documents fetched, {} written, {} failures",
            summary.filings_discovered,
            summary.documents_fetched,
            summary.filings_written,
            summary.failures.len()
        );
        summary
    }
}
