// src/enrich.rs
//
// Cross-references consolidated filings against two read-only lookup
// datasets: historical company names per CIK, and the CIK <-> CUSIP map.
// Both are loaded once per run and passed in explicitly.

use crate::edgar::models::{pad_cik, Filing};
use crate::utils::error::LookupError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Known company names per padded CIK, from a `name:CIK:` file.
#[derive(Debug, Default, Clone)]
pub struct CompanyNames {
    by_cik: HashMap<String, Vec<String>>,
}

impl CompanyNames {
    /// Names may contain colons themselves, so each line is split from the
    /// right: trailing `:`, then the CIK, then everything left is the name.
    pub fn parse(text: &str) -> Self {
        let mut by_cik: HashMap<String, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            let body = line.strip_suffix(':').unwrap_or(line);
            let Some((name, cik)) = body.rsplit_once(':') else {
                continue;
            };
            let (name, cik) = (name.trim(), cik.trim());
            if name.is_empty() || cik.is_empty() || !cik.chars().all(|c| c.is_ascii_digit()) {
                tracing::trace!("Ignoring name line '{}'", line);
                continue;
            }

            let names = by_cik.entry(pad_cik(cik)).or_default();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Self { by_cik }
    }

    /// The published file is not guaranteed to be valid UTF-8.
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let bytes = fs::read(path)?;
        let names = Self::parse(&String::from_utf8_lossy(&bytes));
        if names.is_empty() {
            tracing::warn!("No `name:CIK:` lines found in {}", path.display());
        }
        tracing::info!("Loaded names for {} CIKs from {}", names.len(), path.display());
        Ok(names)
    }

    pub fn names(&self, cik: &str) -> &[String] {
        self.by_cik
            .get(&pad_cik(cik))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_cik.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cik.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct CusipRow {
    cik: String,
    cusip8: String,
}

/// CIK <-> CUSIP-8 map from a `cik,cusip6,cusip8` CSV file. The CUSIP-6
/// column is not needed once CUSIP-8 is known.
#[derive(Debug, Default, Clone)]
pub struct CusipTable {
    cusip8_by_cik: HashMap<String, String>,
    cik_by_cusip8: HashMap<String, String>,
}

impl CusipTable {
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LookupError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::default();
        for row in csv_reader.deserialize::<CusipRow>() {
            let row = row?;
            if row.cik.is_empty() || row.cusip8.is_empty() {
                continue;
            }
            let cik = pad_cik(&row.cik);
            let cusip8 = row.cusip8.to_ascii_uppercase();
            // First row wins in both directions.
            table.cusip8_by_cik.entry(cik.clone()).or_insert_with(|| cusip8.clone());
            table.cik_by_cusip8.entry(cusip8).or_insert(cik);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let table = Self::from_reader(fs::File::open(path)?)?;
        tracing::info!(
            "Loaded {} CUSIP-8 mappings from {}",
            table.cik_by_cusip8.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn cusip8_for_cik(&self, cik: &str) -> Option<&str> {
        self.cusip8_by_cik.get(&pad_cik(cik)).map(String::as_str)
    }

    pub fn cik_for_cusip8(&self, cusip8: &str) -> Option<&str> {
        self.cik_by_cusip8
            .get(&cusip8.to_ascii_uppercase())
            .map(String::as_str)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Lookups {
    pub names: CompanyNames,
    pub cusips: CusipTable,
}

/// Drops the ninth (check) character. The check digit is not validated.
pub fn cusip8(cusip9: &str) -> Option<String> {
    let cusip = cusip9.trim();
    (cusip.len() >= 8 && cusip.is_ascii()).then(|| cusip[..8].to_ascii_uppercase())
}

/// Adds the fund's own CUSIP-8 and historical names, and per holding the
/// CUSIP-8 and issuer CIK. Holdings without a match keep a `None` CIK.
pub fn enrich_filing(filing: &mut Filing, lookups: &Lookups) {
    filing.cusip8 = lookups.cusips.cusip8_for_cik(&filing.cik).map(str::to_string);
    filing.company_names = lookups.names.names(&filing.cik).to_vec();

    for holding in &mut filing.holdings {
        holding.cusip8 = cusip8(&holding.cusip);
        holding.issuer_cik = holding
            .cusip8
            .as_deref()
            .and_then(|c| lookups.cusips.cik_for_cusip8(c))
            .map(str::to_string);
    }
}
