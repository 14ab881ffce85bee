// src/crawler/assembly.rs
//
// Per-filing document assembly.
//
// A filing's documents are visited one at a time. [`AssemblyState`] is the
// continuation threaded between those visits: the filing accumulated so far,
// the documents already folded in, and the document URLs still to fetch. It
// is a plain serializable value, so a work queue can hold it, log it or
// persist it between steps.
//
// ```text
// Discovering --(directory page)--> Resolving --(document)--> Extracting --(last document)--> Complete
//      \------------------(no .xml links)------------------------------------------------------^
// ```

use crate::edgar::models::{DocumentType, Filing, UnclassifiedDocument};
use crate::extractors::primary_doc::PrimaryDocument;
use crate::extractors::{extract_document, resolve_document_urls, ExtractedDocument};
use crate::utils::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Directory page not fetched yet.
    Discovering,
    /// Directory page fetched, document URLs queued, none visited.
    Resolving,
    /// At least one document folded in, more remain.
    Extracting,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedDoc {
    pub url: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyState {
    pub filing: Filing,
    pub phase: Phase,
    pub visited_docs: Vec<VisitedDoc>,
    pub remaining_doc_urls: VecDeque<String>,
}

impl AssemblyState {
    pub fn new(filing: Filing) -> Self {
        Self {
            filing,
            phase: Phase::Discovering,
            visited_docs: Vec::new(),
            remaining_doc_urls: VecDeque::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// The URL whose body the next call to [`advance`](Self::advance) expects.
    pub fn next_url(&self) -> Option<&str> {
        match self.phase {
            Phase::Discovering => Some(self.filing.directory_url.as_str()),
            Phase::Resolving | Phase::Extracting => self.remaining_doc_urls.front().map(String::as_str),
            Phase::Complete => None,
        }
    }

    /// Folds the body fetched from [`next_url`](Self::next_url) into the state.
    ///
    /// Exactly one document is consumed per call. An extraction error on a
    /// recognised document is returned as-is; the filing cannot be trusted
    /// without its metadata.
    pub fn advance(self, body: &str) -> Result<Self, ExtractError> {
        match self.phase {
            Phase::Discovering => Ok(self.resolve(body)),
            Phase::Resolving | Phase::Extracting => self.extract(body),
            Phase::Complete => Ok(self),
        }
    }

    fn resolve(mut self, directory_html: &str) -> Self {
        match resolve_document_urls(directory_html, &self.filing.directory_url) {
            Ok(urls) => {
                tracing::debug!(
                    "{}: {} documents to visit",
                    self.filing.external_id,
                    urls.len()
                );
                self.remaining_doc_urls = urls.into();
                self.phase = Phase::Resolving;
            }
            Err(e) => {
                tracing::warn!("{}: {}; keeping discovery-only record", self.filing.external_id, e);
                self.phase = Phase::Complete;
            }
        }
        self
    }

    fn extract(mut self, body: &str) -> Result<Self, ExtractError> {
        let Some(url) = self.remaining_doc_urls.pop_front() else {
            self.phase = Phase::Complete;
            return Ok(self);
        };

        let extracted = extract_document(body)?;
        let doc_type = extracted.document_type();
        tracing::debug!("{}: {} classified as {}", self.filing.external_id, url, doc_type);

        fold(&mut self.filing, &url, extracted);
        self.visited_docs.push(VisitedDoc { url, doc_type });
        self.phase = if self.remaining_doc_urls.is_empty() {
            Phase::Complete
        } else {
            Phase::Extracting
        };
        Ok(self)
    }
}

/// Shallow merge: later documents overwrite what earlier ones set.
fn fold(filing: &mut Filing, url: &str, extracted: ExtractedDocument) {
    match extracted {
        ExtractedDocument::PrimaryDoc(primary) => apply_primary_doc(filing, primary),
        ExtractedDocument::Holdings(holdings) => filing.holdings = holdings,
        ExtractedDocument::Unknown(content) => filing.unclassified_documents.push(UnclassifiedDocument {
            url: url.to_string(),
            content,
        }),
    }
}

fn apply_primary_doc(filing: &mut Filing, primary: PrimaryDocument) {
    filing.report_date = Some(primary.report_date);
    if primary.is_amendment {
        filing.amendment_type = Some(primary.amendment_type.unwrap_or_default());
        filing.amendment_number = Some(primary.amendment_number);
    } else {
        filing.amendment_type = None;
        filing.amendment_number = None;
    }
    filing.file_number = primary.file_number;
    filing.report_type = Some(primary.report_type);
    filing.submission_type = primary.submission_type;
    filing.filing_manager_name = primary.filing_manager_name;
    filing.manager_address = Some(primary.address);
    filing.other_included_managers_count = Some(primary.other_included_managers_count);
    filing.holdings_count_reported = Some(primary.holdings_count_reported);
    filing.holdings_value_reported = Some(primary.holdings_value_reported);
    filing.is_confidential_omitted = Some(primary.is_confidential_omitted);
    filing.other_managers = primary.other_managers;
}
