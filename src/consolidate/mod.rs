// src/consolidate/mod.rs
//
// Offline passes over a dataset directory. Both are safe to re-run: groups
// of fewer than two records are left as they are.
pub mod amendments;
pub mod fragments;

use crate::storage::StorageManager;
use crate::utils::error::StorageError;
use amendments::DedupSummary;
use fragments::ReassemblySummary;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsolidationSummary {
    pub reassembly: ReassemblySummary,
    pub dedup: DedupSummary,
}

/// Fragment reassembly first, so amendment grouping sees whole records.
pub fn consolidate(storage: &StorageManager) -> Result<ConsolidationSummary, StorageError> {
    tracing::info!("Consolidating dataset in {}", storage.base_dir().display());

    let reassembly = fragments::reassemble_fragments(storage)?;
    tracing::info!(
        "Fragment reassembly: {} merged, {} failed",
        reassembly.groups_merged,
        reassembly.groups_failed
    );

    let dedup = amendments::deduplicate_amendments(storage)?;
    tracing::info!(
        "Amendment dedup: {} groups merged, {} records superseded",
        dedup.groups_merged,
        dedup.records_removed
    );

    Ok(ConsolidationSummary { reassembly, dedup })
}
