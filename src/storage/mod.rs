// src/storage/mod.rs
pub mod chunk;

use crate::edgar::models::Filing;
use crate::utils::error::StorageError;
use chunk::{chunk_record, ChunkedRecord, RecordFragment};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A record file in the dataset directory: either a whole filing or one
/// fragment of an oversized one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    Fragment(RecordFragment),
    Filing(Box<Filing>),
}

/// Dataset directory holding one JSON record per filing
/// (`<externalId>.json`) or per fragment (`<externalId>.part0001.json`).
pub struct StorageManager {
    base_dir: PathBuf,
    max_record_bytes: usize,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P, max_record_bytes: usize) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self {
            base_dir: base_path,
            max_record_bytes,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn whole_path(&self, external_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", external_id))
    }

    fn fragment_path(&self, external_id: &str, sequence: usize) -> PathBuf {
        self.base_dir.join(format!("{}.part{:04}.json", external_id, sequence))
    }

    /// Writes a completed filing, chunking it when it exceeds the record ceiling.
    pub fn write_filing(&self, filing: &Filing) -> Result<Vec<PathBuf>, StorageError> {
        match chunk_record(&filing.external_id, filing, self.max_record_bytes)? {
            ChunkedRecord::Whole(serialized) => {
                Ok(vec![self.write_whole(&filing.external_id, &serialized)?])
            }
            ChunkedRecord::Fragments(fragments) => {
                tracing::info!(
                    "{} exceeds {} bytes, writing {} fragments",
                    filing.external_id,
                    self.max_record_bytes,
                    fragments.len()
                );
                let mut paths = Vec::with_capacity(fragments.len());
                for fragment in &fragments {
                    let path = self.fragment_path(&fragment.external_id, fragment.sequence);
                    fs::write(&path, serde_json::to_string(fragment)?)?;
                    paths.push(path);
                }
                Ok(paths)
            }
        }
    }

    /// Writes an already-serialized filing without any size check. Offline
    /// passes use this; the ceiling only applies to the online sink.
    pub fn write_whole(&self, external_id: &str, serialized: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.whole_path(external_id);
        fs::write(&file_path, serialized)?;
        tracing::debug!("Saved record to {}", file_path.display());
        Ok(file_path)
    }

    pub fn rewrite_filing(&self, filing: &Filing) -> Result<PathBuf, StorageError> {
        self.write_whole(&filing.external_id, &serde_json::to_string(filing)?)
    }

    /// All `*.json` record files, sorted by name.
    pub fn record_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn read_record(&self, path: &Path) -> Result<StoredRecord, StorageError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn remove(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path)?;
        tracing::debug!("Removed {}", path.display());
        Ok(())
    }

    /// Streams whole filings one file at a time. Unreadable files and
    /// leftover fragments are logged and skipped.
    pub fn filings(&self) -> Result<impl Iterator<Item = (PathBuf, Filing)> + '_, StorageError> {
        let paths = self.record_paths()?;
        Ok(paths.into_iter().filter_map(move |path| match self.read_record(&path) {
            Ok(StoredRecord::Filing(filing)) => Some((path, *filing)),
            Ok(StoredRecord::Fragment(fragment)) => {
                tracing::warn!(
                    "Skipping unassembled fragment {} of {} ({})",
                    fragment.sequence,
                    fragment.correlation_id,
                    path.display()
                );
                None
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                None
            }
        }))
    }
}
