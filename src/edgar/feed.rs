// src/edgar/feed.rs
//
// "Latest filings" Atom feed.
//
// Each `<entry>` looks like:
//
// ```xml
// <entry>
//   <title>13F-HR - BERKSHIRE HATHAWAY INC (0001067983) (Filer)</title>
//   <link rel="alternate" type="text/html"
//         href="https://www.sec.gov/Archives/edgar/data/1067983/000095012323001234/0000950123-23-001234-index.htm"/>
//   <updated>2023-02-14T16:05:12-05:00</updated>
//   <category scheme="https://www.sec.gov/" label="form type" term="13F-HR"/>
// </entry>
// ```

use crate::edgar::client::Fetch;
use crate::edgar::models::{accession_number, pad_cik};
use crate::utils::config::Settings;
use crate::utils::error::{AppError, SourceError};
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<form>.+?)\s+-\s+(?P<name>.+)\s+\((?P<cik>\d{1,10})\)")
        .expect("Failed to compile TITLE_RE")
});

const FORM_TYPE_LABEL: &str = "form type";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub form_type: String,
    pub company_name: String,
    pub cik: String,
    pub directory_url: String,
    /// Trailing directory segment, e.g. `000095012323001234`.
    pub external_id: String,
    /// Dashed form of `external_id`.
    pub accession_number: String,
    pub updated: DateTime<FixedOffset>,
}

/// One parsed feed page. `raw_count` counts every `<entry>`, including the
/// ones that were skipped, so pagination sees the true page length.
#[derive(Debug, Default)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub raw_count: usize,
}

/// `{base}/cgi-bin/browse-edgar?action=getcurrent&type=...&start=...&count=...&output=atom`
pub fn feed_url(base: &str, form_type: &str, start: usize, count: usize) -> String {
    format!(
        "{}/cgi-bin/browse-edgar?action=getcurrent&type={}&company=&dateb=&owner=include&start={}&count={}&output=atom",
        base.trim_end_matches('/'),
        form_type,
        start,
        count
    )
}

fn child_text<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
        .and_then(|c| c.text())
        .map(str::trim)
}

fn parse_entry(entry: roxmltree::Node) -> Result<FeedEntry, SourceError> {
    let title = child_text(entry, "title").unwrap_or_default();
    let captures = TITLE_RE
        .captures(title)
        .ok_or_else(|| SourceError::BadTitle(title.to_string()))?;

    let form_type = entry
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "category")
        .find(|c| {
            c.attribute("label")
                .map(|label| label.eq_ignore_ascii_case(FORM_TYPE_LABEL))
                .unwrap_or(false)
        })
        .and_then(|c| c.attribute("term"))
        .map(|term| term.trim().to_string())
        .ok_or_else(|| SourceError::MissingCategory(FORM_TYPE_LABEL.to_string()))?;

    let link = entry
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "link")
        .and_then(|c| c.attribute("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or_else(|| SourceError::MissingLink(title.to_string()))?;

    // Drop the detail-page suffix to get the filing directory.
    let directory_url = link
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
        .ok_or_else(|| SourceError::MissingLink(link.to_string()))?;
    let external_id = directory_url
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| SourceError::MissingField("directory segment".to_string()))?;

    let updated_raw = child_text(entry, "updated")
        .ok_or_else(|| SourceError::MissingField("updated".to_string()))?;
    let updated = DateTime::parse_from_rfc3339(updated_raw)
        .map_err(|_| SourceError::BadTimestamp(updated_raw.to_string()))?;

    Ok(FeedEntry {
        form_type,
        company_name: captures["name"].trim().to_string(),
        cik: pad_cik(&captures["cik"]),
        directory_url: directory_url.to_string(),
        external_id: external_id.to_string(),
        accession_number: accession_number(external_id),
        updated,
    })
}

/// Parses one page. Malformed entries are logged and skipped; entries older
/// than `cutoff` are dropped silently.
pub fn parse_feed_page(
    body: &str,
    cutoff: Option<DateTime<FixedOffset>>,
) -> Result<FeedPage, SourceError> {
    if body.trim().is_empty() {
        return Err(SourceError::EmptyBody("feed page".to_string()));
    }
    let document =
        roxmltree::Document::parse(body).map_err(|e| SourceError::MalformedFeed(e.to_string()))?;

    let mut page = FeedPage::default();
    for entry in document
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "entry")
    {
        page.raw_count += 1;
        match parse_entry(entry) {
            Ok(parsed) => {
                if cutoff.map(|c| parsed.updated < c).unwrap_or(false) {
                    tracing::trace!("Skipping {} filed before cutoff", parsed.accession_number);
                    continue;
                }
                page.entries.push(parsed);
            }
            Err(e) => tracing::warn!("Skipping feed entry: {}", e),
        }
    }
    Ok(page)
}

async fn fetch_page<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
    cutoff: Option<DateTime<FixedOffset>>,
) -> Result<FeedPage, AppError> {
    let body = fetcher.fetch(url).await?;
    Ok(parse_feed_page(&body, cutoff)?)
}

/// Walks the feed page by page until a short page or the page limit.
///
/// A failure on the first page is an error. A failure on a later page ends
/// the walk and the entries gathered so far are returned.
pub async fn fetch_recent<F: Fetch + ?Sized>(
    fetcher: &F,
    settings: &Settings,
    form_type: &str,
    cutoff: Option<DateTime<FixedOffset>>,
) -> Result<Vec<FeedEntry>, AppError> {
    let page_size = settings.feed_page_size.max(1);
    let mut entries = Vec::new();

    for page_number in 0..settings.feed_max_pages {
        let url = feed_url(settings.base(), form_type, page_number * page_size, page_size);
        let page = match fetch_page(fetcher, &url, cutoff).await {
            Ok(page) => page,
            Err(e) if page_number == 0 => return Err(e),
            Err(e) => {
                tracing::error!(
                    "Feed page {} for {} failed, keeping {} entries: {}",
                    page_number,
                    form_type,
                    entries.len(),
                    e
                );
                break;
            }
        };
        tracing::info!(
            "Feed page {} for {}: {} entries ({} kept)",
            page_number,
            form_type,
            page.raw_count,
            page.entries.len()
        );
        entries.extend(page.entries);

        if page.raw_count < page_size {
            break;
        }
    }
    Ok(entries)
}
