// src/consolidate/fragments.rs

use crate::edgar::models::Filing;
use crate::storage::chunk::RecordFragment;
use crate::storage::{StorageManager, StoredRecord};
use crate::utils::error::{ConsolidationError, StorageError};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReassemblySummary {
    pub groups_merged: usize,
    pub groups_failed: usize,
    pub fragments_removed: usize,
}

/// Orders one correlation group and concatenates its payloads.
///
/// The group must hold every sequence index from 0 to `fragment_count - 1`
/// exactly once, and the joined payload must parse as a filing.
pub fn reassemble(
    correlation_id: &str,
    mut fragments: Vec<RecordFragment>,
) -> Result<(Filing, String), ConsolidationError> {
    fragments.sort_by_key(|f| f.sequence);

    for (expected, fragment) in fragments.iter().enumerate() {
        if fragment.sequence != expected {
            return Err(ConsolidationError::MissingSequence {
                correlation_id: correlation_id.to_string(),
                missing: expected,
            });
        }
    }
    let declared = fragments.iter().map(|f| f.fragment_count).max().unwrap_or(0);
    if declared != fragments.len() {
        return Err(ConsolidationError::FragmentCount {
            correlation_id: correlation_id.to_string(),
            expected: declared,
            found: fragments.len(),
        });
    }

    let payload: String = fragments.iter().map(|f| f.payload.as_str()).collect();
    let filing = serde_json::from_str::<Filing>(&payload).map_err(|source| {
        ConsolidationError::InvalidPayload {
            correlation_id: correlation_id.to_string(),
            source,
        }
    })?;
    Ok((filing, payload))
}

/// Pass 1: merges every correlation group of two or more fragments back into
/// a whole record and deletes the fragment files. A failing group is logged
/// and left on disk untouched.
pub fn reassemble_fragments(storage: &StorageManager) -> Result<ReassemblySummary, StorageError> {
    // Index only paths per correlation id; payloads are re-read per group.
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in storage.record_paths()? {
        match storage.read_record(&path) {
            Ok(StoredRecord::Fragment(fragment)) => {
                groups.entry(fragment.correlation_id).or_default().push(path);
            }
            Ok(StoredRecord::Filing(_)) => {}
            Err(e) => tracing::error!("Failed to read {}: {}", path.display(), e),
        }
    }

    let mut summary = ReassemblySummary::default();
    for (correlation_id, paths) in groups {
        if paths.len() < 2 {
            tracing::debug!("Correlation group {} has a single fragment, nothing to merge", correlation_id);
            continue;
        }

        match merge_group(storage, &correlation_id, &paths) {
            Ok(external_id) => {
                tracing::info!(
                    "Reassembled {} from {} fragments",
                    external_id,
                    paths.len()
                );
                summary.groups_merged += 1;
                summary.fragments_removed += paths.len();
            }
            Err(e) => {
                tracing::error!("Leaving fragments of {} in place: {}", correlation_id, e);
                summary.groups_failed += 1;
            }
        }
    }
    Ok(summary)
}

fn merge_group(
    storage: &StorageManager,
    correlation_id: &str,
    paths: &[PathBuf],
) -> Result<String, ConsolidationError> {
    let mut fragments = Vec::with_capacity(paths.len());
    for path in paths {
        if let StoredRecord::Fragment(fragment) = storage.read_record(path)? {
            fragments.push(fragment);
        }
    }

    let (filing, payload) = reassemble(correlation_id, fragments)?;
    storage.write_whole(&filing.external_id, &payload)?;
    for path in paths {
        storage.remove(path)?;
    }
    Ok(filing.external_id)
}
