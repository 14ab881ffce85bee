// src/main.rs
mod consolidate;
mod crawler;
mod edgar;
mod enrich;
mod export;
mod extractors;
mod storage;
mod timeseries;
mod utils;

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, Parser, Subcommand};
use crawler::{Crawler, Enqueue, WorkItem, WorkQueue};
use edgar::client::EdgarClient;
use edgar::models::Period;
use enrich::{CompanyNames, CusipTable, Lookups};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storage::StorageManager;
use utils::config;
use utils::{AppError, Settings};

/// 13F institutional holdings: crawl EDGAR, consolidate, export flat tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Dataset directory holding one JSON record per filing
    #[arg(short, long, env = "DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// User-Agent sent to EDGAR (SEC asks for a name and contact email)
    #[arg(long, env = "EDGAR_USER_AGENT", default_value = config::DEFAULT_USER_AGENT, global = true)]
    user_agent: String,

    /// Archive base URL
    #[arg(long, env = "EDGAR_BASE_URL", default_value = config::DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Delay before each request, in milliseconds
    #[arg(long, env = "EDGAR_REQUEST_DELAY_MS", default_value_t = config::DEFAULT_REQUEST_DELAY_MS, global = true)]
    request_delay_ms: u64,

    /// Largest record written as a single file; bigger ones are fragmented
    #[arg(long, env = "MAX_RECORD_BYTES", default_value_t = config::DEFAULT_MAX_RECORD_BYTES, global = true)]
    max_record_bytes: usize,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the quarterly full-index listings
    Crawl {
        /// First quarter, e.g. 2023Q1
        #[arg(long)]
        from: Period,

        /// Last quarter (defaults to the current one)
        #[arg(long)]
        to: Option<Period>,
    },
    /// Crawl the recent-filings feed
    Recent {
        /// Skip entries published before this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<FixedOffset>>,
    },
    /// Reassemble fragments and merge amendments in the dataset directory
    Consolidate,
    /// Enrich the dataset and write funds/filings/holdings/quarterly_positions CSVs
    Export {
        /// `name:CIK:` company names file
        #[arg(long, env = "NAMES_FILE")]
        names_file: Option<PathBuf>,

        /// `cik,cusip6,cusip8` CSV file
        #[arg(long, env = "CUSIP_FILE")]
        cusip_file: Option<PathBuf>,

        /// Output directory for the CSV tables
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,

        /// Also write the enriched records back into the dataset
        #[arg(long)]
        persist_enriched: bool,
    },
}

impl GlobalArgs {
    fn settings(&self) -> Result<Settings, AppError> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config("User-Agent must not be empty".to_string()));
        }
        Ok(Settings {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_record_bytes: self.max_record_bytes,
            ..Settings::default()
        })
    }
}

async fn crawl(storage: &StorageManager, settings: &Settings, periods: Vec<Period>) -> Result<(), AppError> {
    let client = EdgarClient::new(settings)?;
    let crawler = Crawler::new(&client, storage, settings);

    let mut queue = WorkQueue::default();
    for period in periods {
        match crawler.discover_quarter(period).await {
            Ok(filings) => queue.enqueue(filings.into_iter().map(WorkItem::seed).collect()),
            Err(e) => tracing::error!("Failed to list {}: {}", period, e),
        }
    }
    if queue.is_empty() {
        tracing::warn!("No 13F filings discovered");
    }
    finish(crawler.run(&mut queue).await)
}

async fn recent(
    storage: &StorageManager,
    settings: &Settings,
    since: Option<DateTime<FixedOffset>>,
) -> Result<(), AppError> {
    let client = EdgarClient::new(settings)?;
    let crawler = Crawler::new(&client, storage, settings);

    let filings = crawler.discover_recent(since).await;
    let mut queue = WorkQueue::default();
    queue.enqueue(filings.into_iter().map(WorkItem::seed).collect());
    finish(crawler.run(&mut queue).await)
}

fn finish(summary: crawler::CrawlSummary) -> Result<(), AppError> {
    if summary.filings_written == 0 && !summary.failures.is_empty() {
        return Err(AppError::Processing(format!(
            "No filings written, {} failures",
            summary.failures.len()
        )));
    }
    Ok(())
}

fn load_lookups(names_file: Option<&Path>, cusip_file: Option<&Path>) -> Result<Lookups, AppError> {
    let names = match names_file {
        Some(path) => CompanyNames::load(path)?,
        None => {
            tracing::warn!("No names file given, company names will be empty");
            CompanyNames::default()
        }
    };
    let cusips = match cusip_file {
        Some(path) => CusipTable::load(path)?,
        None => {
            tracing::warn!("No CUSIP file given, CUSIP-8 and issuer CIK will be empty");
            CusipTable::default()
        }
    };
    Ok(Lookups { names, cusips })
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    utils::logging::setup_logging(cli.global.verbose);
    tracing::info!("Starting with args: {:?}", cli);

    let settings = cli.global.settings()?;
    let storage = StorageManager::new(&cli.global.data_dir, settings.max_record_bytes)?;

    match cli.command {
        Command::Crawl { from, to } => {
            let to = to.unwrap_or_else(|| Period::containing(Utc::now().date_naive()));
            let periods = Period::range(from, to);
            if periods.is_empty() {
                return Err(AppError::Config(format!("--from {} is after --to {}", from, to)));
            }
            crawl(&storage, &settings, periods).await?;
        }
        Command::Recent { since } => recent(&storage, &settings, since).await?,
        Command::Consolidate => {
            consolidate::consolidate(&storage)?;
        }
        Command::Export {
            names_file,
            cusip_file,
            output_dir,
            persist_enriched,
        } => {
            let lookups = load_lookups(names_file.as_deref(), cusip_file.as_deref())?;
            export::export_dataset(&storage, &lookups, &output_dir, persist_enriched)?;
        }
    }

    tracing::info!("Done.");
    Ok(())
}
