// src/export.rs
//
// Flat tables for analysis. A single streaming pass reads each consolidated
// filing, enriches it, writes its filing and holding rows and feeds the time
// series builder; funds and quarterly positions are written at the end.

use crate::edgar::models::Filing;
use crate::enrich::{enrich_filing, Lookups};
use crate::storage::StorageManager;
use crate::timeseries::TimeSeriesBuilder;
use crate::utils::error::AppError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const FUNDS_FILE: &str = "funds.csv";
pub const FILINGS_FILE: &str = "filings.csv";
pub const HOLDINGS_FILE: &str = "holdings.csv";
pub const POSITIONS_FILE: &str = "quarterly_positions.csv";

#[derive(Debug, Clone, Serialize)]
struct FundRow {
    cik: String,
    name: String,
    cusip8: Option<String>,
    /// `;`-separated historical names.
    company_names: String,
    latest_report_date: Option<NaiveDate>,
    filings: usize,
}

#[derive(Debug, Serialize)]
struct FilingRow<'a> {
    external_id: &'a str,
    accession_number: String,
    cik: &'a str,
    company_name: &'a str,
    form_type: &'a str,
    date_filed: Option<NaiveDate>,
    report_date: Option<NaiveDate>,
    report_type: Option<&'a str>,
    amendment_type: Option<&'a str>,
    amendment_number: Option<u32>,
    file_number: Option<&'a str>,
    holdings_count_reported: Option<u64>,
    holdings_value_reported: Option<f64>,
    holdings: usize,
    previous_versions: usize,
    directory_url: &'a str,
}

#[derive(Debug, Serialize)]
struct HoldingRow<'a> {
    external_id: &'a str,
    fund_cik: &'a str,
    report_date: Option<NaiveDate>,
    cusip: &'a str,
    cusip8: Option<&'a str>,
    issuer_cik: Option<&'a str>,
    issuer_name: &'a str,
    class_title: &'a str,
    value: f64,
    shares_or_principal_amount: f64,
    amount_type: &'a str,
    put_call: Option<&'a str>,
    investment_discretion: &'a str,
    voting_sole: Option<&'a str>,
    voting_shared: Option<&'a str>,
    voting_none: Option<&'a str>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExportSummary {
    pub funds: usize,
    pub filings: usize,
    pub holdings: usize,
    pub positions: usize,
}

fn filing_row(filing: &Filing) -> FilingRow<'_> {
    FilingRow {
        external_id: &filing.external_id,
        accession_number: filing.accession_number(),
        cik: &filing.cik,
        company_name: &filing.company_name,
        form_type: &filing.form_type,
        date_filed: filing.date_filed,
        report_date: filing.report_date,
        report_type: filing.report_type.as_deref(),
        amendment_type: filing.amendment_type.as_deref(),
        amendment_number: filing.amendment_number,
        file_number: filing.file_number.as_deref(),
        holdings_count_reported: filing.holdings_count_reported,
        holdings_value_reported: filing.holdings_value_reported,
        holdings: filing.holdings.len(),
        previous_versions: filing.previous_versions.len(),
        directory_url: &filing.directory_url,
    }
}

/// Keeps the name and report date of the newest filing seen for the fund.
fn update_fund(funds: &mut BTreeMap<String, FundRow>, filing: &Filing) {
    let name = filing
        .filing_manager_name
        .clone()
        .unwrap_or_else(|| filing.company_name.clone());
    let fund = funds.entry(filing.cik.clone()).or_insert_with(|| FundRow {
        cik: filing.cik.clone(),
        name: name.clone(),
        cusip8: filing.cusip8.clone(),
        company_names: filing.company_names.join(";"),
        latest_report_date: filing.report_date,
        filings: 0,
    });
    fund.filings += 1;
    if filing.report_date > fund.latest_report_date {
        fund.latest_report_date = filing.report_date;
        fund.name = name;
    }
}

/// Writes the four tables into `output_dir`. With `persist_enriched`, the
/// enriched filings are also written back to the dataset.
pub fn export_dataset(
    storage: &StorageManager,
    lookups: &Lookups,
    output_dir: &Path,
    persist_enriched: bool,
) -> Result<ExportSummary, AppError> {
    fs::create_dir_all(output_dir)?;
    let mut filings_csv = csv::Writer::from_path(output_dir.join(FILINGS_FILE))?;
    let mut holdings_csv = csv::Writer::from_path(output_dir.join(HOLDINGS_FILE))?;

    let mut summary = ExportSummary::default();
    let mut funds: BTreeMap<String, FundRow> = BTreeMap::new();
    let mut builder = TimeSeriesBuilder::new();

    for (path, mut filing) in storage.filings()? {
        enrich_filing(&mut filing, lookups);
        if persist_enriched {
            if let Err(e) = storage.rewrite_filing(&filing) {
                tracing::error!("Failed to persist enriched {}: {}", path.display(), e);
            }
        }

        filings_csv.serialize(filing_row(&filing))?;
        for holding in &filing.holdings {
            holdings_csv.serialize(HoldingRow {
                external_id: &filing.external_id,
                fund_cik: &filing.cik,
                report_date: filing.report_date,
                cusip: &holding.cusip,
                cusip8: holding.cusip8.as_deref(),
                issuer_cik: holding.issuer_cik.as_deref(),
                issuer_name: &holding.issuer_name,
                class_title: &holding.class_title,
                value: holding.value,
                shares_or_principal_amount: holding.shares_or_principal_amount,
                amount_type: &holding.amount_type,
                put_call: holding.put_call.as_deref(),
                investment_discretion: &holding.investment_discretion,
                voting_sole: holding.voting_authority.sole.as_deref(),
                voting_shared: holding.voting_authority.shared.as_deref(),
                voting_none: holding.voting_authority.none.as_deref(),
            })?;
        }

        summary.filings += 1;
        summary.holdings += filing.holdings.len();
        update_fund(&mut funds, &filing);
        builder.add_filing(&filing);
    }
    filings_csv.flush()?;
    holdings_csv.flush()?;

    let mut funds_csv = csv::Writer::from_path(output_dir.join(FUNDS_FILE))?;
    for fund in funds.values() {
        funds_csv.serialize(fund)?;
    }
    funds_csv.flush()?;
    summary.funds = funds.len();

    let mut positions_csv = csv::Writer::from_path(output_dir.join(POSITIONS_FILE))?;
    for position in builder.build() {
        positions_csv.serialize(&position)?;
        summary.positions += 1;
    }
    positions_csv.flush()?;

    tracing::info!(
        "Exported {} funds, {} filings, {} holdings, {} quarterly positions to {}",
        summary.funds,
        summary.filings,
        summary.holdings,
        summary.positions,
        output_dir.display()
    );
    Ok(summary)
}
