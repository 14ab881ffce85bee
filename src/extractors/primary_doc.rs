// src/extractors/primary_doc.rs

use crate::edgar::models::{ManagerAddress, OtherManager};
use crate::extractors::xml;
use crate::utils::error::ExtractError;
use chrono::NaiveDate;
use roxmltree::{Document, Node};

const REPORT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Cover page and summary page of a 13F primary document.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryDocument {
    pub report_date: NaiveDate,
    pub submission_type: Option<String>,
    pub filing_manager_name: Option<String>,
    pub address: ManagerAddress,
    pub report_type: String,
    pub is_amendment: bool,
    pub amendment_type: Option<String>,
    pub amendment_number: u32,
    pub file_number: Option<String>,
    pub other_included_managers_count: u32,
    pub holdings_count_reported: u64,
    pub holdings_value_reported: f64,
    pub is_confidential_omitted: bool,
    pub other_managers: Vec<OtherManager>,
}

fn required(node: Node, names: &[&str]) -> Result<String, ExtractError> {
    xml::text_at(node, names).ok_or_else(|| ExtractError::MissingElement(names.join("/")))
}

fn parse_report_date(raw: &str) -> Result<NaiveDate, ExtractError> {
    NaiveDate::parse_from_str(raw.trim(), REPORT_DATE_FORMAT)
        .map_err(|_| ExtractError::BadDate(raw.to_string()))
}

fn is_truthy(raw: Option<String>) -> bool {
    raw.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn parse_u32_or_zero(field: &str, raw: Option<&str>) -> Result<u32, ExtractError> {
    let value = xml::parse_u64_or_zero(field, raw)?;
    u32::try_from(value).map_err(|_| ExtractError::BadNumber {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn extract_address(cover_page: Node) -> ManagerAddress {
    let Some(address) = xml::path(cover_page, &["filingManager", "address"]) else {
        return ManagerAddress::default();
    };
    let lower = |name: &str| xml::text_at(address, &[name]).map(|v| v.to_lowercase());
    let upper = |name: &str| xml::text_at(address, &[name]).map(|v| v.to_uppercase());

    ManagerAddress {
        street1: lower("street1"),
        street2: lower("street2"),
        city: lower("city"),
        state_or_country: upper("stateOrCountry"),
        zip_code: xml::text_at(address, &["zipCode"]),
    }
}

fn parse_other_manager(
    node: Node,
    sequence_number: Option<&str>,
) -> Result<Option<OtherManager>, ExtractError> {
    let Some(name) = xml::text_at(node, &["name"]) else {
        return Ok(None);
    };
    let sequence_number = match sequence_number {
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| ExtractError::BadNumber {
            field: "sequenceNumber".to_string(),
            value: raw.to_string(),
        })?),
        None => None,
    };
    Ok(Some(OtherManager {
        sequence_number,
        file_number: xml::text_at(node, &["form13FFileNumber"]),
        name,
    }))
}

/// Co-filing managers: numbered ones from the summary page, falling back to
/// the unnumbered list some notice filings put on the cover page.
fn extract_other_managers(
    cover_page: Node,
    summary_page: Option<Node>,
) -> Result<Vec<OtherManager>, ExtractError> {
    let mut managers = Vec::new();

    if let Some(info) = summary_page.and_then(|s| xml::child(s, "otherManagers2Info")) {
        for entry in xml::children(info, "otherManager2") {
            let sequence = xml::text_at(entry, &["sequenceNumber"]);
            if let Some(manager) = xml::child(entry, "otherManager") {
                if let Some(parsed) = parse_other_manager(manager, sequence.as_deref())? {
                    managers.push(parsed);
                }
            }
        }
    }

    if managers.is_empty() {
        if let Some(info) = xml::child(cover_page, "otherManagersInfo") {
            for manager in xml::children(info, "otherManager") {
                if let Some(parsed) = parse_other_manager(manager, None)? {
                    managers.push(parsed);
                }
            }
        }
    }
    Ok(managers)
}

/// Strict: any missing required element or unparseable value fails the
/// whole document.
pub fn extract_primary_doc(document: &Document) -> Result<PrimaryDocument, ExtractError> {
    let root = document.root_element();
    let cover_page = xml::path(root, &["formData", "coverPage"])
        .ok_or_else(|| ExtractError::MissingElement("formData/coverPage".to_string()))?;
    let summary_page = xml::path(root, &["formData", "summaryPage"]);

    let raw_date = xml::text_at(root, &["headerData", "filerInfo", "periodOfReport"])
        .or_else(|| xml::text_at(cover_page, &["reportCalendarOrQuarter"]))
        .ok_or_else(|| ExtractError::MissingElement("periodOfReport".to_string()))?;
    let report_date = parse_report_date(&raw_date)?;

    let report_type = required(cover_page, &["reportType"])?.to_lowercase();

    let amendment_type = xml::text_at(cover_page, &["amendmentInfo", "amendmentType"])
        .map(|v| v.to_lowercase());
    let is_amendment =
        is_truthy(xml::text_at(cover_page, &["isAmendment"])) || amendment_type.is_some();
    let amendment_number = xml::text_at(cover_page, &["amendmentNo"]);
    let amendment_number = parse_u32_or_zero("amendmentNo", amendment_number.as_deref())?;

    let summary_text = |name: &str| summary_page.and_then(|s| xml::text_at(s, &[name]));
    let other_included_managers_count = parse_u32_or_zero(
        "otherIncludedManagersCount",
        summary_text("otherIncludedManagersCount").as_deref(),
    )?;
    let holdings_count_reported =
        xml::parse_u64_or_zero("tableEntryTotal", summary_text("tableEntryTotal").as_deref())?;
    let holdings_value_reported =
        xml::parse_f64_or_zero("tableValueTotal", summary_text("tableValueTotal").as_deref())?;
    let is_confidential_omitted = is_truthy(summary_text("isConfidentialOmitted"));

    Ok(PrimaryDocument {
        report_date,
        submission_type: xml::text_at(root, &["headerData", "submissionType"]),
        filing_manager_name: xml::text_at(cover_page, &["filingManager", "name"]),
        address: extract_address(cover_page),
        report_type,
        is_amendment,
        amendment_type,
        amendment_number,
        file_number: xml::text_at(cover_page, &["form13FFileNumber"]),
        other_included_managers_count,
        holdings_count_reported,
        holdings_value_reported,
        is_confidential_omitted,
        other_managers: extract_other_managers(cover_page, summary_page)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PRIMARY_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<edgarSubmission xmlns="http://www.sec.gov/edgar/thirteenffiler" xmlns:com="http://www.sec.gov/edgar/common">
  <headerData>
    <submissionType>13F-HR/A</submissionType>
    <filerInfo>
      <liveTestFlag>LIVE</liveTestFlag>
      <filer><credentials><cik>0001067983</cik><ccc>XXXXXXXX</ccc></credentials></filer>
      <periodOfReport>12-31-2022</periodOfReport>
    </filerInfo>
  </headerData>
  <formData>
    <coverPage>
      <reportCalendarOrQuarter>12-31-2022</reportCalendarOrQuarter>
      <isAmendment>true</isAmendment>
      <amendmentNo>2</amendmentNo>
      <amendmentInfo><amendmentType>RESTATEMENT</amendmentType></amendmentInfo>
      <filingManager>
        <name>Berkshire Hathaway Inc</name>
        <address>
          <com:street1>3555 Farnam Street</com:street1>
          <com:city>Omaha</com:city>
          <com:stateOrCountry>ne</com:stateOrCountry>
          <com:zipCode>68131</com:zipCode>
        </address>
      </filingManager>
      <reportType>13F HOLDINGS REPORT</reportType>
      <form13FFileNumber>028-04545</form13FFileNumber>
    </coverPage>
    <summaryPage>
      <otherIncludedManagersCount>1</otherIncludedManagersCount>
      <tableEntryTotal>2</tableEntryTotal>
      <tableValueTotal>1,500</tableValueTotal>
      <isConfidentialOmitted>TRUE</isConfidentialOmitted>
      <otherManagers2Info>
        <otherManager2>
          <sequenceNumber>1</sequenceNumber>
          <otherManager><form13FFileNumber>028-05678</form13FFileNumber><name>National Indemnity Co</name></otherManager>
        </otherManager2>
      </otherManagers2Info>
    </summaryPage>
  </formData>
</edgarSubmission>"#;

    #[test]
    fn extracts_cover_and_summary_page() {
        let doc = xml::parse(PRIMARY_DOC).unwrap();
        let primary = extract_primary_doc(&doc).unwrap();

        assert_eq!(primary.report_date, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
        assert_eq!(primary.submission_type.as_deref(), Some("13F-HR/A"));
        assert_eq!(primary.report_type, "13f holdings report");
        assert!(primary.is_amendment);
        assert_eq!(primary.amendment_type.as_deref(), Some("restatement"));
        assert_eq!(primary.amendment_number, 2);
        assert_eq!(primary.file_number.as_deref(), Some("028-04545"));
        assert_eq!(primary.address.street1.as_deref(), Some("3555 farnam street"));
        assert_eq!(primary.address.city.as_deref(), Some("omaha"));
        assert_eq!(primary.address.state_or_country.as_deref(), Some("NE"));
        assert_eq!(primary.other_included_managers_count, 1);
        assert_eq!(primary.holdings_count_reported, 2);
        assert_eq!(primary.holdings_value_reported, 1500.0);
        assert!(primary.is_confidential_omitted);
        assert_eq!(
            primary.other_managers,
            vec![OtherManager {
                sequence_number: Some(1),
                file_number: Some("028-05678".to_string()),
                name: "National Indemnity Co".to_string(),
            }]
        );
    }

    #[test]
    fn blank_summary_fields_default_to_zero() {
        let xml_doc = r#"<edgarSubmission><formData><coverPage>
            <reportCalendarOrQuarter>03-31-2023</reportCalendarOrQuarter>
            <reportType>13F NOTICE</reportType>
            <otherManagersInfo><otherManager><name>Other Adviser LLC</name></otherManager></otherManagersInfo>
          </coverPage><summaryPage><tableEntryTotal></tableEntryTotal><tableValueTotal> </tableValueTotal></summaryPage></formData></edgarSubmission>"#;
        let doc = xml::parse(xml_doc).unwrap();
        let primary = extract_primary_doc(&doc).unwrap();
        assert_eq!(primary.holdings_count_reported, 0);
        assert_eq!(primary.holdings_value_reported, 0.0);
        assert_eq!(primary.amendment_number, 0);
        assert!(!primary.is_amendment);
        assert!(primary.amendment_type.is_none());
        assert!(!primary.is_confidential_omitted);
        assert_eq!(primary.other_managers.len(), 1);
        assert_eq!(primary.other_managers[0].sequence_number, None);
    }

    #[test]
    fn missing_report_period_is_an_error() {
        let xml_doc = r#"<edgarSubmission><formData><coverPage><reportType>13F HOLDINGS REPORT</reportType></coverPage></formData></edgarSubmission>"#;
        let doc = xml::parse(xml_doc).unwrap();
        assert_eq!(
            extract_primary_doc(&doc),
            Err(ExtractError::MissingElement("periodOfReport".to_string()))
        );
    }

    #[test]
    fn bad_date_and_bad_number_are_errors() {
        let bad_date = r#"<edgarSubmission><formData><coverPage><reportCalendarOrQuarter>2022-12-31</reportCalendarOrQuarter><reportType>x</reportType></coverPage></formData></edgarSubmission>"#;
        let doc = xml::parse(bad_date).unwrap();
        assert!(matches!(extract_primary_doc(&doc), Err(ExtractError::BadDate(_))));

        let bad_count = r#"<edgarSubmission><formData><coverPage><reportCalendarOrQuarter>12-31-2022</reportCalendarOrQuarter><reportType>x</reportType></coverPage><summaryPage><tableEntryTotal>many</tableEntryTotal></summaryPage></formData></edgarSubmission>"#;
        let doc = xml::parse(bad_count).unwrap();
        assert!(matches!(extract_primary_doc(&doc), Err(ExtractError::BadNumber { .. })));
    }

    #[test]
    fn amendment_number_beyond_u32_is_an_error() {
        let huge = r#"<edgarSubmission><formData><coverPage><reportCalendarOrQuarter>12-31-2022</reportCalendarOrQuarter><amendmentNo>4294967296</amendmentNo><reportType>x</reportType></coverPage></formData></edgarSubmission>"#;
        let doc = xml::parse(huge).unwrap();
        assert_eq!(
            extract_primary_doc(&doc),
            Err(ExtractError::BadNumber {
                field: "amendmentNo".to_string(),
                value: "4294967296".to_string(),
            })
        );
    }

    #[test]
    fn only_true_marks_confidential_omission() {
        assert!(is_truthy(Some("True".to_string())));
        assert!(!is_truthy(Some("Y".to_string())));
        assert!(!is_truthy(Some("yes".to_string())));
        assert!(!is_truthy(None));
    }
}
