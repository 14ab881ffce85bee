// src/extractors/xml.rs
//
// Namespace-agnostic lookups. 13F documents come with and without namespace
// prefixes (`ns1:infoTable`, `com:street1`), so everything matches on local
// names, case-insensitively.

use crate::utils::error::ExtractError;
use roxmltree::{Document, Node, ParsingOptions};

pub fn parse(xml: &str) -> Result<Document<'_>, ExtractError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml.trim_start_matches('\u{feff}'), options)
        .map_err(|e| ExtractError::XmlParse(e.to_string()))
}

pub fn is_named(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_named(c, name))
}

pub fn children<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    node.children().filter(|c| is_named(c, name)).collect()
}

/// Follows a path of child element names.
pub fn path<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Option<Node<'a, 'input>> {
    names.iter().try_fold(node, |current, name| child(current, name))
}

/// All text below `node`, trimmed. `None` when blank.
pub fn text(node: Node) -> Option<String> {
    let joined: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn text_at(node: Node, names: &[&str]) -> Option<String> {
    path(node, names).and_then(text)
}

/// Numbers in 13F documents sometimes carry thousands separators.
fn clean_number(raw: &str) -> String {
    raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

pub fn parse_f64_or_zero(field: &str, raw: Option<&str>) -> Result<f64, ExtractError> {
    match raw.map(clean_number).filter(|s| !s.is_empty()) {
        None => Ok(0.0),
        Some(s) => s.parse::<f64>().map_err(|_| ExtractError::BadNumber {
            field: field.to_string(),
            value: s,
        }),
    }
}

pub fn parse_u64_or_zero(field: &str, raw: Option<&str>) -> Result<u64, ExtractError> {
    match raw.map(clean_number).filter(|s| !s.is_empty()) {
        None => Ok(0),
        Some(s) => s.parse::<u64>().map_err(|_| ExtractError::BadNumber {
            field: field.to_string(),
            value: s,
        }),
    }
}
