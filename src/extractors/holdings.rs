// src/extractors/holdings.rs

use crate::edgar::models::{Holding, VotingAuthority};
use crate::extractors::xml;
use crate::utils::error::ExtractError;
use roxmltree::{Document, Node};

pub const CUSIP_LEN: usize = 9;

/// Upper-cases and left-pads a CUSIP with zeros to 9 characters.
///
/// Older filings sometimes drop leading zeros or the trailing check digit;
/// padding keeps every identifier the same width. Anything that is not an
/// ASCII letter or digit is discarded and overlong values are cut to 9.
pub fn normalize_cusip(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(CUSIP_LEN)
        .collect();
    format!("{:0>width$}", cleaned, width = CUSIP_LEN)
}

fn parse_row(row: Node) -> Result<Holding, ExtractError> {
    let text = |names: &[&str]| xml::text_at(row, names);

    let voting = xml::child(row, "votingAuthority");
    let voting_text = |name: &str| voting.and_then(|v| xml::text_at(v, &[name]));

    Ok(Holding {
        cusip: normalize_cusip(&text(&["cusip"]).unwrap_or_default()),
        issuer_name: text(&["nameOfIssuer"]).unwrap_or_default(),
        class_title: text(&["titleOfClass"]).unwrap_or_default(),
        value: xml::parse_f64_or_zero("value", text(&["value"]).as_deref())?,
        shares_or_principal_amount: xml::parse_f64_or_zero(
            "sshPrnamt",
            text(&["shrsOrPrnAmt", "sshPrnamt"]).as_deref(),
        )?,
        amount_type: text(&["shrsOrPrnAmt", "sshPrnamtType"])
            .map(|v| v.to_lowercase())
            .unwrap_or_default(),
        put_call: text(&["putCall"]),
        investment_discretion: text(&["investmentDiscretion"]).unwrap_or_default(),
        other_manager: text(&["otherManager"]),
        voting_authority: VotingAuthority {
            sole: voting_text("Sole"),
            shared: voting_text("Shared"),
            none: voting_text("None"),
        },
        figi: text(&["figi"]),
        cusip8: None,
        issuer_cik: None,
    })
}

/// Every `infoTable` row of an information table, in document order.
pub fn extract_holdings(document: &Document) -> Result<Vec<Holding>, ExtractError> {
    document
        .root_element()
        .descendants()
        .filter(|n| xml::is_named(n, "infoTable"))
        .map(parse_row)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const INFO_TABLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<informationTable xmlns="http://www.sec.gov/edgar/document/thirteenf/informationtable">
  <infoTable>
    <nameOfIssuer>APPLE INC</nameOfIssuer>
    <titleOfClass>COM</titleOfClass>
    <cusip>037833100</cusip>
    <value>1000</value>
    <shrsOrPrnAmt><sshPrnamt>10</sshPrnamt><sshPrnamtType>SH</sshPrnamtType></shrsOrPrnAmt>
    <investmentDiscretion>DFND</investmentDiscretion>
    <otherManager>1</otherManager>
    <votingAuthority><Sole>10</Sole><Shared>0</Shared><None>0</None></votingAuthority>
  </infoTable>
  <infoTable>
    <nameOfIssuer>ACTIVISION BLIZZARD INC</nameOfIssuer>
    <titleOfClass>COM</titleOfClass>
    <cusip>5077v109</cusip>
    <value></value>
    <shrsOrPrnAmt><sshPrnamt>20</sshPrnamt><sshPrnamtType>Prn</sshPrnamtType></shrsOrPrnAmt>
    <putCall>Call</putCall>
    <investmentDiscretion>SOLE</investmentDiscretion>
  </infoTable>
</informationTable>"#;

    #[test]
    fn extracts_rows_in_order() {
        let doc = xml::parse(INFO_TABLE).unwrap();
        let holdings = extract_holdings(&doc).unwrap();
        assert_eq!(holdings.len(), 2);

        let apple = &holdings[0];
        assert_eq!(apple.cusip, "037833100");
        assert_eq!(apple.issuer_name, "APPLE INC");
        assert_eq!(apple.value, 1000.0);
        assert_eq!(apple.shares_or_principal_amount, 10.0);
        assert_eq!(apple.amount_type, "sh");
        assert_eq!(apple.other_manager.as_deref(), Some("1"));
        assert_eq!(apple.voting_authority.sole.as_deref(), Some("10"));

        let second = &holdings[1];
        assert_eq!(second.cusip, "05077V109");
        assert_eq!(second.value, 0.0);
        assert_eq!(second.amount_type, "prn");
        assert_eq!(second.put_call.as_deref(), Some("Call"));
        assert_eq!(second.voting_authority, VotingAuthority::default());
    }

    #[test]
    fn cusips_are_always_nine_upper_case_characters() {
        for raw in ["", "1", "37833100", "g0403h108", "0378-3310-0", "ABCDEFGHIJKL", " 5077v109 "] {
            let cusip = normalize_cusip(raw);
            assert_eq!(cusip.len(), CUSIP_LEN, "{raw:?} -> {cusip:?}");
            assert_eq!(cusip, cusip.to_ascii_uppercase());
        }
        assert_eq!(normalize_cusip("37833100"), "037833100");
    }

    #[test]
    fn non_numeric_value_fails_the_document() {
        let xml_doc = r#"<informationTable><infoTable><cusip>037833100</cusip><value>n/a</value></infoTable></informationTable>"#;
        let doc = xml::parse(xml_doc).unwrap();
        assert!(matches!(extract_holdings(&doc), Err(ExtractError::BadNumber { .. })));
    }
}
