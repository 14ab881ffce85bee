// src/edgar/normalize.rs
//
// Listing rows and feed entries both become `Filing` shells carrying the same
// identifiers and URLs, so a filing seen through either source is the same filing.

use crate::edgar::feed::FeedEntry;
use crate::edgar::models::{accession_number, pad_cik, Filing};
use crate::utils::config::Settings;
use crate::utils::error::SourceError;
use chrono::NaiveDate;
use std::collections::HashMap;

const COL_CIK: &str = "CIK";
const COL_COMPANY: &str = "Company Name";
const COL_FORM: &str = "Form Type";
const COL_DATE: &str = "Date Filed";
const COL_FILENAME: &str = "Filename";

/// Builds the URL family for a submission from its `edgar/data/<cik>/<accession>.txt` path.
fn urls_from_submission_path(base: &str, path: &str) -> (String, String, String, String) {
    let path = path.trim().trim_start_matches('/');
    let full_submission_url = format!("{}/Archives/{}", base, path);

    let directory_path = path.strip_suffix(".txt").unwrap_or(path).replace('-', "");
    let directory_url = format!("{}/Archives/{}", base, directory_path);
    let external_id = directory_path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let index_page_url = format!("{}/{}-index.html", directory_url, accession_number(&external_id));

    (external_id, directory_url, full_submission_url, index_page_url)
}

/// Converts a `master.idx` row. Rows with a non-13F form type yield `Ok(None)`.
pub fn filing_from_index_row(
    row: &HashMap<String, String>,
    settings: &Settings,
) -> Result<Option<Filing>, SourceError> {
    let form_type = row
        .get(COL_FORM)
        .map(|f| f.trim())
        .ok_or_else(|| SourceError::MissingField(COL_FORM.to_string()))?;
    if !settings.accepts_form(form_type) {
        return Ok(None);
    }

    let filename = row
        .get(COL_FILENAME)
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| SourceError::MissingField(COL_FILENAME.to_string()))?;
    let cik = row
        .get(COL_CIK)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| SourceError::MissingField(COL_CIK.to_string()))?;

    let (external_id, directory_url, full_submission_url, index_page_url) =
        urls_from_submission_path(settings.base(), filename);

    Ok(Some(Filing {
        external_id,
        company_name: row.get(COL_COMPANY).cloned().unwrap_or_default(),
        cik: pad_cik(cik),
        form_type: form_type.to_string(),
        date_filed: row
            .get(COL_DATE)
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
        directory_url,
        full_submission_url,
        index_page_url,
        ..Filing::default()
    }))
}

/// Converts a feed entry. Entries with a non-13F form type yield `None`.
pub fn filing_from_feed_entry(entry: &FeedEntry, settings: &Settings) -> Option<Filing> {
    if !settings.accepts_form(&entry.form_type) {
        return None;
    }

    // The full submission text file sits next to the accession directory.
    let cik_directory = entry
        .directory_url
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or(entry.directory_url.as_str());

    Some(Filing {
        external_id: entry.external_id.clone(),
        company_name: entry.company_name.clone(),
        cik: entry.cik.clone(),
        form_type: entry.form_type.clone(),
        date_filed: Some(entry.updated.date_naive()),
        directory_url: entry.directory_url.clone(),
        full_submission_url: format!("{}/{}.txt", cik_directory, entry.accession_number),
        index_page_url: format!("{}/{}-index.html", entry.directory_url, entry.accession_number),
        ..Filing::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn row(form: &str) -> HashMap<String, String> {
        [
            (COL_CIK, "1067983"),
            (COL_COMPANY, "BERKSHIRE HATHAWAY INC"),
            (COL_FORM, form),
            (COL_DATE, "2023-02-14"),
            (COL_FILENAME, "edgar/data/1067983/0000950123-23-001234.txt"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn index_row_becomes_filing_shell() {
        let filing = filing_from_index_row(&row("13F-HR"), &Settings::default())
            .unwrap()
            .unwrap();
        assert_eq!(filing.cik, "0001067983");
        assert_eq!(filing.external_id, "000095012323001234");
        assert_eq!(
            filing.directory_url,
            "https://www.sec.gov/Archives/edgar/data/1067983/000095012323001234"
        );
        assert_eq!(
            filing.full_submission_url,
            "https://www.sec.gov/Archives/edgar/data/1067983/0000950123-23-001234.txt"
        );
        assert_eq!(
            filing.index_page_url,
            "https://www.sec.gov/Archives/edgar/data/1067983/000095012323001234/0000950123-23-001234-index.html"
        );
        assert_eq!(filing.date_filed, NaiveDate::from_ymd_opt(2023, 2, 14));
        assert!(filing.report_date.is_none());
    }

    #[test]
    fn other_form_types_are_dropped() {
        assert_eq!(filing_from_index_row(&row("10-K"), &Settings::default()).unwrap(), None);
        assert_eq!(filing_from_index_row(&row("SC 13G"), &Settings::default()).unwrap(), None);
    }

    #[test]
    fn missing_filename_is_a_source_error() {
        let mut r = row("13F-HR");
        r.remove(COL_FILENAME);
        assert_eq!(
            filing_from_index_row(&r, &Settings::default()),
            Err(SourceError::MissingField(COL_FILENAME.to_string()))
        );
    }

    #[test]
    fn dashes_in_base_url_are_kept() {
        let settings = Settings {
            base_url: "http://edgar-mirror.local".to_string(),
            ..Settings::default()
        };
        let filing = filing_from_index_row(&row("13F-HR"), &settings).unwrap().unwrap();
        assert!(filing.directory_url.starts_with("http://edgar-mirror.local/Archives/"));
    }

    #[test]
    fn feed_and_index_agree_on_identity() {
        let entry = FeedEntry {
            form_type: "13F-HR".to_string(),
            company_name: "BERKSHIRE HATHAWAY INC".to_string(),
            cik: "0001067983".to_string(),
            directory_url: "https://www.sec.gov/Archives/edgar/data/1067983/000095012323001234".to_string(),
            external_id: "000095012323001234".to_string(),
            accession_number: "0000950123-23-001234".to_string(),
            updated: DateTime::parse_from_rfc3339("2023-02-14T16:05:12-05:00").unwrap(),
        };
        let from_feed = filing_from_feed_entry(&entry, &Settings::default()).unwrap();
        let from_index = filing_from_index_row(&row("13F-HR"), &Settings::default())
            .unwrap()
            .unwrap();

        assert_eq!(from_feed.external_id, from_index.external_id);
        assert_eq!(from_feed.directory_url, from_index.directory_url);
        assert_eq!(from_feed.full_submission_url, from_index.full_submission_url);
        assert_eq!(from_feed.index_page_url, from_index.index_page_url);
        assert_eq!(from_feed.date_filed, from_index.date_filed);
    }
}
