// src/edgar/models.rs
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One 13F submission, accumulated field by field as its documents are visited.
///
/// A `Filing` starts life as an identifier shell (from a listing row or a feed
/// entry), picks up cover-page metadata from the primary document and its
/// holdings from the information table. After consolidation it may also carry
/// the superseded amendment predecessors and cross-reference fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filing {
    pub external_id: String,
    pub company_name: String,
    pub cik: String,
    pub form_type: String,
    pub date_filed: Option<NaiveDate>,
    pub directory_url: String,
    pub full_submission_url: String,
    pub index_page_url: String,

    // --- Cover page (primary document) ---
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub amendment_type: Option<String>,
    #[serde(default)]
    pub amendment_number: Option<u32>,
    #[serde(default)]
    pub file_number: Option<String>,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub submission_type: Option<String>,
    #[serde(default)]
    pub filing_manager_name: Option<String>,
    #[serde(default)]
    pub manager_address: Option<ManagerAddress>,
    #[serde(default)]
    pub other_included_managers_count: Option<u32>,
    #[serde(default)]
    pub holdings_count_reported: Option<u64>,
    #[serde(default)]
    pub holdings_value_reported: Option<f64>,
    #[serde(default)]
    pub is_confidential_omitted: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_managers: Vec<OtherManager>,

    // --- Information table ---
    #[serde(default)]
    pub holdings: Vec<Holding>,

    /// XML documents that matched neither marker, kept verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified_documents: Vec<UnclassifiedDocument>,

    // --- Consolidation / enrichment ---
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_versions: Vec<PreviousVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cusip8: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company_names: Vec<String>,
}

impl Filing {
    /// Dashed accession number (`NNNNNNNNNN-YY-NNNNNN`) for this filing.
    pub fn accession_number(&self) -> String {
        accession_number(&self.external_id)
    }

    pub fn is_amendment(&self) -> bool {
        self.amendment_type.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerAddress {
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state_or_country: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherManager {
    pub sequence_number: Option<u32>,
    pub file_number: Option<String>,
    pub name: String,
}

/// One disclosed position. Owned by exactly one filing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub cusip: String,
    pub issuer_name: String,
    pub class_title: String,
    pub value: f64,
    pub shares_or_principal_amount: f64,
    pub amount_type: String,
    #[serde(default)]
    pub put_call: Option<String>,
    pub investment_discretion: String,
    #[serde(default)]
    pub other_manager: Option<String>,
    #[serde(default)]
    pub voting_authority: VotingAuthority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cusip8: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_cik: Option<String>,
}

/// Sole / shared / none voting authority, verbatim from the information table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotingAuthority {
    pub sole: Option<String>,
    pub shared: Option<String>,
    pub none: Option<String>,
}

/// Reference to an amendment predecessor, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousVersion {
    pub external_id: String,
    pub report_date: Option<NaiveDate>,
    pub directory_url: String,
}

impl From<&Filing> for PreviousVersion {
    fn from(filing: &Filing) -> Self {
        PreviousVersion {
            external_id: filing.external_id.clone(),
            report_date: filing.report_date,
            directory_url: filing.directory_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    PrimaryDoc,
    HoldingsTable,
    Unknown,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::PrimaryDoc => "primary_doc",
            DocumentType::HoldingsTable => "holdings_table",
            DocumentType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnclassifiedDocument {
    pub url: String,
    pub content: String,
}

/// A calendar quarter, used to address full-index files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    quarter: u8,
}

impl Period {
    /// Returns `None` unless `quarter` is 1..=4.
    pub fn new(year: i32, quarter: u8) -> Option<Self> {
        (1..=4).contains(&quarter).then_some(Self { year, quarter })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: ((date.month() - 1) / 3 + 1) as u8,
        }
    }

    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self { year: self.year + 1, quarter: 1 }
        } else {
            Self { year: self.year, quarter: self.quarter + 1 }
        }
    }

    /// All quarters from `from` to `to`, inclusive. Empty if `from > to`.
    pub fn range(from: Period, to: Period) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = from;
        while current <= to {
            periods.push(current);
            current = current.next();
        }
        periods
    }

    /// `{base}/Archives/edgar/full-index/{year}/QTR{q}/master.idx`
    pub fn master_index_url(&self, base: &str) -> String {
        format!(
            "{}/Archives/edgar/full-index/{}/QTR{}/master.idx",
            base.trim_end_matches('/'),
            self.year,
            self.quarter
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

/// Accepts `2023Q1`, `2023-Q1` and `2023q1`.
impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let (year, quarter) = upper
            .split_once('Q')
            .ok_or_else(|| format!("'{}' is not a quarter like 2023Q1", s))?;
        let year: i32 = year
            .trim_end_matches('-')
            .parse()
            .map_err(|_| format!("Invalid year in '{}'", s))?;
        let quarter: u8 = quarter.parse().map_err(|_| format!("Invalid quarter in '{}'", s))?;
        Period::new(year, quarter).ok_or_else(|| format!("Quarter must be 1-4 in '{}'", s))
    }
}

/// Zero-pads a CIK to the 10 digits EDGAR uses in most places.
pub fn pad_cik(cik: &str) -> String {
    let digits = cik.trim().trim_start_matches('0');
    format!("{:0>10}", digits)
}

/// Formats an 18-digit submission id as `NNNNNNNNNN-YY-NNNNNN`.
/// Shorter ids are zero-padded on the left first.
pub fn accession_number(external_id: &str) -> String {
    let padded = format!("{:0>18}", external_id.trim());
    if padded.len() != 18 || !padded.is_ascii() {
        return padded;
    }
    format!("{}-{}-{}", &padded[..10], &padded[10..12], &padded[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_invalid_quarter() {
        assert!(Period::new(2023, 0).is_none());
        assert!(Period::new(2023, 5).is_none());
        assert_eq!(Period::new(2023, 4).map(|p| p.to_string()).as_deref(), Some("2023Q4"));
    }

    #[test]
    fn period_range_crosses_year_boundary() {
        let from = Period::new(2022, 3).unwrap();
        let to = Period::new(2023, 2).unwrap();
        let labels: Vec<String> = Period::range(from, to).iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["2022Q3", "2022Q4", "2023Q1", "2023Q2"]);
        assert!(Period::range(to, from).is_empty());
    }

    #[test]
    fn period_parses_from_label() {
        assert_eq!("2023Q1".parse::<Period>(), Ok(Period::new(2023, 1).unwrap()));
        assert_eq!("2021-q4".parse::<Period>(), Ok(Period::new(2021, 4).unwrap()));
        assert!("2023Q5".parse::<Period>().is_err());
        assert!("2023".parse::<Period>().is_err());
    }

    #[test]
    fn period_containing_date() {
        let date = NaiveDate::from_ymd_opt(2023, 8, 14).unwrap();
        assert_eq!(Period::containing(date), Period::new(2023, 3).unwrap());
    }

    #[test]
    fn master_index_url_format() {
        let period = Period::new(2020, 1).unwrap();
        assert_eq!(
            period.master_index_url("https://www.sec.gov/"),
            "https://www.sec.gov/Archives/edgar/full-index/2020/QTR1/master.idx"
        );
    }

    #[test]
    fn cik_is_padded_to_ten_digits() {
        assert_eq!(pad_cik("1067983"), "0001067983");
        assert_eq!(pad_cik(" 0001067983 "), "0001067983");
    }

    #[test]
    fn accession_number_is_dashed() {
        assert_eq!(accession_number("000095012323001234"), "0000950123-23-001234");
        assert_eq!(accession_number("95012323001234"), "0000950123-23-001234");
    }
}
