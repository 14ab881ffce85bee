// src/extractors/classify.rs
//
// Document purpose is decided by what the document contains, never by its
// filename. Each classifier is a marker check paired with the extractor to
// run when it matches; the first match wins.

use crate::edgar::models::{DocumentType, Holding};
use crate::extractors::holdings::extract_holdings;
use crate::extractors::primary_doc::{extract_primary_doc, PrimaryDocument};
use crate::extractors::xml;
use crate::utils::error::ExtractError;
use roxmltree::Document;

const PRIMARY_DOC_WRAPPER: &str = "edgarSubmission";
const HOLDINGS_WRAPPER: &str = "informationTable";

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedDocument {
    PrimaryDoc(PrimaryDocument),
    Holdings(Vec<Holding>),
    /// Neither marker matched (or the XML would not parse); the raw text is kept.
    Unknown(String),
}

impl ExtractedDocument {
    pub fn document_type(&self) -> DocumentType {
        match self {
            ExtractedDocument::PrimaryDoc(_) => DocumentType::PrimaryDoc,
            ExtractedDocument::Holdings(_) => DocumentType::HoldingsTable,
            ExtractedDocument::Unknown(_) => DocumentType::Unknown,
        }
    }
}

type Marker = fn(&Document) -> bool;
type Extractor = fn(&Document) -> Result<ExtractedDocument, ExtractError>;

struct Classifier {
    marker: Marker,
    extract: Extractor,
}

static CLASSIFIERS: [Classifier; 2] = [
    Classifier {
        marker: has_primary_doc_marker,
        extract: extract_as_primary_doc,
    },
    Classifier {
        marker: has_holdings_marker,
        extract: extract_as_holdings,
    },
];

fn extract_as_primary_doc(document: &Document) -> Result<ExtractedDocument, ExtractError> {
    extract_primary_doc(document).map(ExtractedDocument::PrimaryDoc)
}

fn extract_as_holdings(document: &Document) -> Result<ExtractedDocument, ExtractError> {
    extract_holdings(document).map(ExtractedDocument::Holdings)
}

fn has_root_wrapper(document: &Document, wrapper: &str) -> bool {
    let root = document.root_element();
    xml::is_named(&root, wrapper) && xml::text(root).is_some()
}

/// Root element is a filing-submission wrapper with content.
pub fn has_primary_doc_marker(document: &Document) -> bool {
    has_root_wrapper(document, PRIMARY_DOC_WRAPPER)
}

/// Root element is an information-table wrapper with content.
pub fn has_holdings_marker(document: &Document) -> bool {
    has_root_wrapper(document, HOLDINGS_WRAPPER)
}

/// Classifies `body` and runs the matching extractor.
///
/// Unparseable XML is not an error here: nothing can be said about its
/// purpose, so it is passed through as unknown. Extraction errors from a
/// recognised document are propagated.
pub fn extract_document(body: &str) -> Result<ExtractedDocument, ExtractError> {
    let document = match xml::parse(body) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Keeping unparseable document as unknown: {}", e);
            return Ok(ExtractedDocument::Unknown(body.to_string()));
        }
    };

    match CLASSIFIERS.iter().find(|c| (c.marker)(&document)) {
        Some(classifier) => (classifier.extract)(&document),
        None => Ok(ExtractedDocument::Unknown(body.to_string())),
    }
}
