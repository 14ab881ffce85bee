// src/utils/error.rs
use thiserror::Error;

// Transport failures of the fetch collaborator
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {0} for {1}")]
    Http(reqwest::StatusCode, String),

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// A listing row or feed entry that does not have the expected shape.
/// Fatal for that entry only.
#[derive(Error, Debug, PartialEq)]
pub enum SourceError {
    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Feed entry is missing a '{0}' category")]
    MissingCategory(String),

    #[error("Feed entry title does not match '<form> - <name> (<cik>)': {0}")]
    BadTitle(String),

    #[error("Feed entry has no usable link: {0}")]
    MissingLink(String),

    #[error("Missing field '{0}'")]
    MissingField(String),

    #[error("Invalid timestamp '{0}'")]
    BadTimestamp(String),

    #[error("Malformed feed document: {0}")]
    MalformedFeed(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Required element <{0}> is missing")]
    MissingElement(String),

    #[error("Invalid date '{0}', expected MM-DD-YYYY")]
    BadDate(String),

    #[error("Invalid number '{value}' in <{field}>")]
    BadNumber { field: String, value: String },

    #[error("No .xml documents found in directory listing {0}")]
    NoDocumentsFound(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Record ceiling of {0} bytes is too small to hold a fragment envelope")]
    CeilingTooSmall(usize),
}

/// Failures that abort consolidation of a single correlation group.
#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("Correlation group {correlation_id} is missing sequence index {missing}")]
    MissingSequence { correlation_id: String, missing: usize },

    #[error("Correlation group {correlation_id} expected {expected} fragments, found {found}")]
    FragmentCount {
        correlation_id: String,
        expected: usize,
        found: usize,
    },

    #[error("Reassembled payload for {correlation_id} does not parse: {source}")]
    InvalidPayload {
        correlation_id: String,
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Source format error: {0}")]
    Source(#[from] SourceError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Consolidation failed: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("Lookup table error: {0}")]
    Lookup(#[from] LookupError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}
