// src/extractors/mod.rs
pub mod classify;
pub mod holdings;
pub mod primary_doc;
pub mod resolver;
pub mod xml;

// Re-export key extraction types for convenience
pub use classify::{extract_document, ExtractedDocument};
pub use resolver::resolve_document_urls;
