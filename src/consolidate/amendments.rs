// src/consolidate/amendments.rs

use crate::edgar::models::{Filing, PreviousVersion};
use crate::storage::{StorageManager, StoredRecord};
use crate::utils::error::{ConsolidationError, StorageError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Everything amendment merging needs to know about a record without
/// keeping its holdings in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub path: PathBuf,
    pub external_id: String,
    pub report_date: Option<NaiveDate>,
    pub date_filed: Option<NaiveDate>,
    pub amendment_number: Option<u32>,
    pub is_amendment: bool,
    pub directory_url: String,
    pub previous_versions: Vec<PreviousVersion>,
}

impl VersionInfo {
    pub fn from_filing(path: PathBuf, filing: &Filing) -> Self {
        Self {
            path,
            external_id: filing.external_id.clone(),
            report_date: filing.report_date,
            date_filed: filing.date_filed,
            amendment_number: filing.amendment_number,
            is_amendment: filing.is_amendment(),
            directory_url: filing.directory_url.clone(),
            previous_versions: filing.previous_versions.clone(),
        }
    }

    fn sort_key(&self) -> (Option<NaiveDate>, Option<NaiveDate>, u32, &str) {
        (
            self.report_date,
            self.date_filed,
            self.amendment_number.unwrap_or(0),
            self.external_id.as_str(),
        )
    }

    fn reference(&self) -> PreviousVersion {
        PreviousVersion {
            external_id: self.external_id.clone(),
            report_date: self.report_date,
            directory_url: self.directory_url.clone(),
        }
    }
}

/// Outcome of ordering one amendment group.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub canonical: VersionInfo,
    pub superseded: Vec<VersionInfo>,
    /// The canonical record's full `previousVersions` after the merge.
    pub previous_versions: Vec<PreviousVersion>,
}

/// Orders a group oldest to newest and picks the newest as canonical.
///
/// Returns `None` unless at least two versions in the group declare an
/// amendment type; such groups are left alone.
pub fn select_canonical(mut group: Vec<VersionInfo>) -> Option<Selection> {
    if group.len() < 2 || group.iter().filter(|v| v.is_amendment).count() < 2 {
        return None;
    }
    group.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let canonical = group.pop()?;

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(canonical.external_id.clone());
    let mut previous_versions = Vec::new();

    let inherited = canonical.previous_versions.iter().cloned();
    let superseded_refs = group
        .iter()
        .flat_map(|v| v.previous_versions.iter().cloned().chain(std::iter::once(v.reference())));
    for version in inherited.chain(superseded_refs) {
        if seen.insert(version.external_id.clone()) {
            previous_versions.push(version);
        }
    }

    Some(Selection {
        canonical,
        superseded: group,
        previous_versions,
    })
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DedupSummary {
    pub groups_merged: usize,
    pub records_removed: usize,
    pub groups_failed: usize,
}

/// Pass 2: collapses every file-number group holding more than one
/// amendment down to its newest version.
pub fn deduplicate_amendments(storage: &StorageManager) -> Result<DedupSummary, StorageError> {
    let mut groups: BTreeMap<String, Vec<VersionInfo>> = BTreeMap::new();
    for (path, filing) in storage.filings()? {
        let Some(file_number) = filing.file_number.as_deref().map(str::trim).filter(|f| !f.is_empty()) else {
            tracing::debug!("{} has no file number, not grouped", filing.external_id);
            continue;
        };
        groups
            .entry(file_number.to_string())
            .or_default()
            .push(VersionInfo::from_filing(path, &filing));
    }

    let mut summary = DedupSummary::default();
    for (file_number, group) in groups {
        let Some(selection) = select_canonical(group) else {
            continue;
        };

        match apply_selection(storage, &selection) {
            Ok(()) => {
                tracing::info!(
                    "{}: kept {}, superseded {}",
                    file_number,
                    selection.canonical.external_id,
                    selection.superseded.len()
                );
                summary.groups_merged += 1;
                summary.records_removed += selection.superseded.len();
            }
            Err(e) => {
                tracing::error!("Failed to merge amendments for {}: {}", file_number, e);
                summary.groups_failed += 1;
            }
        }
    }
    Ok(summary)
}

fn apply_selection(storage: &StorageManager, selection: &Selection) -> Result<(), ConsolidationError> {
    let mut canonical = match storage.read_record(&selection.canonical.path)? {
        StoredRecord::Filing(filing) => *filing,
        StoredRecord::Fragment(_) => return Ok(()),
    };
    canonical.previous_versions = selection.previous_versions.clone();
    storage.rewrite_filing(&canonical)?;

    for version in &selection.superseded {
        storage.remove(&version.path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::Holding;

    fn version(external_id: &str, report: (i32, u32, u32), filed: (i32, u32, u32), amendment: Option<u32>) -> Filing {
        Filing {
            external_id: external_id.to_string(),
            cik: "0001067983".to_string(),
            directory_url: format!("https://www.sec.gov/Archives/edgar/data/1067983/{external_id}"),
            date_filed: NaiveDate::from_ymd_opt(filed.0, filed.1, filed.2),
            report_date: NaiveDate::from_ymd_opt(report.0, report.1, report.2),
            file_number: Some("028-04545".to_string()),
            amendment_type: amendment.map(|_| "restatement".to_string()),
            amendment_number: amendment,
            holdings: vec![Holding {
                cusip: "037833100".to_string(),
                value: 100.0 + f64::from(amendment.unwrap_or(0)),
                ..Holding::default()
            }],
            ..Filing::default()
        }
    }

    fn info(filing: &Filing) -> VersionInfo {
        VersionInfo::from_filing(PathBuf::from(format!("{}.json", filing.external_id)), filing)
    }

    #[test]
    fn newest_version_is_canonical() {
        let group = vec![
            info(&version("000095012323000003", (2022, 12, 31), (2023, 3, 1), Some(2))),
            info(&version("000095012323000001", (2022, 12, 31), (2023, 2, 14), None)),
            info(&version("000095012323000002", (2022, 12, 31), (2023, 2, 20), Some(1))),
        ];
        let selection = select_canonical(group).unwrap();
        assert_eq!(selection.canonical.external_id, "000095012323000003");
        assert_eq!(selection.previous_versions.len(), 2);
        assert_eq!(
            selection.previous_versions.iter().map(|v| v.external_id.as_str()).collect::<Vec<_>>(),
            vec!["000095012323000001", "000095012323000002"]
        );
    }

    #[test]
    fn date_filed_outranks_external_id() {
        // An older-format id that sorts lexically after the newer one.
        let group = vec![
            info(&version("999999999922000001", (2022, 12, 31), (2023, 2, 14), Some(1))),
            info(&version("000095012323000002", (2022, 12, 31), (2023, 5, 2), Some(1))),
        ];
        let selection = select_canonical(group).unwrap();
        assert_eq!(selection.canonical.external_id, "000095012323000002");
    }

    #[test]
    fn groups_without_amendments_are_untouched() {
        let single = vec![info(&version("1", (2022, 12, 31), (2023, 2, 14), Some(1)))];
        assert!(select_canonical(single).is_none());

        let originals = vec![
            info(&version("1", (2022, 12, 31), (2023, 2, 14), None)),
            info(&version("2", (2022, 12, 31), (2023, 2, 15), None)),
        ];
        assert!(select_canonical(originals).is_none());

        let one_amendment = vec![
            info(&version("1", (2022, 12, 31), (2023, 2, 14), None)),
            info(&version("2", (2022, 12, 31), (2023, 3, 1), Some(1))),
        ];
        assert!(select_canonical(one_amendment).is_none());
    }

    #[test]
    fn original_with_single_amendment_is_kept_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path(), 1_000_000).unwrap();
        storage
            .write_filing(&version("000095012323000001", (2022, 12, 31), (2023, 2, 14), None))
            .unwrap();
        storage
            .write_filing(&version("000095012323000002", (2022, 12, 31), (2023, 3, 1), Some(1)))
            .unwrap();

        assert_eq!(deduplicate_amendments(&storage).unwrap(), DedupSummary::default());
        assert_eq!(storage.record_paths().unwrap().len(), 2);
    }

    #[test]
    fn pass_rewrites_canonical_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path(), 1_000_000).unwrap();
        let original = version("000095012323000001", (2022, 12, 31), (2023, 2, 14), None);
        let first = version("000095012323000002", (2022, 12, 31), (2023, 3, 1), Some(1));
        let second = version("000095012323000003", (2022, 12, 31), (2023, 3, 20), Some(2));
        let other_filer = Filing {
            file_number: Some("028-11111".to_string()),
            ..version("000095012323000009", (2022, 12, 31), (2023, 2, 10), Some(1))
        };
        for filing in [&original, &first, &second, &other_filer] {
            storage.write_filing(filing).unwrap();
        }

        let summary = deduplicate_amendments(&storage).unwrap();
        assert_eq!(summary.groups_merged, 1);
        assert_eq!(summary.records_removed, 2);

        let remaining: Vec<Filing> = storage.filings().unwrap().map(|(_, f)| f).collect();
        assert_eq!(remaining.len(), 2);
        let canonical = remaining
            .iter()
            .find(|f| f.external_id == "000095012323000003")
            .unwrap();
        assert_eq!(
            canonical.previous_versions,
            vec![PreviousVersion::from(&original), PreviousVersion::from(&first)]
        );
        assert_eq!(canonical.holdings, second.holdings);
        assert!(remaining.iter().any(|f| f.external_id == "000095012323000009"));

        assert_eq!(deduplicate_amendments(&storage).unwrap(), DedupSummary::default());
    }
}
