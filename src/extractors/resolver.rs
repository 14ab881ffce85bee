// src/extractors/resolver.rs

use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Failed to compile LINK_SELECTOR"));

/// Filename hint used only for ordering. Classification is done on content.
fn hint_rank(url: &str) -> u8 {
    let name = url.rsplit('/').next().unwrap_or(url).to_ascii_lowercase();
    if name.contains("primary") && name.contains("doc") {
        0
    } else if name.contains("info") && name.contains("table") {
        1
    } else {
        2
    }
}

/// Collects every `.xml` link on a filing directory page as an absolute URL.
///
/// Links that look like a primary document come first, then ones that look
/// like an information table, then the rest in page order. Duplicates are
/// dropped.
pub fn resolve_document_urls(directory_html: &str, page_url: &str) -> Result<Vec<String>, ExtractError> {
    // Directory URLs are usually given without the trailing slash, which
    // would make relative links resolve against the parent directory.
    let base = Url::parse(&format!("{}/", page_url.trim_end_matches('/'))).ok();
    let document = Html::parse_document(directory_html);

    let mut urls: Vec<String> = Vec::new();
    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        let path = href.split(['?', '#']).next().unwrap_or(href);
        if !path.to_ascii_lowercase().ends_with(".xml") {
            continue;
        }

        let absolute = match &base {
            Some(base) => base.join(href).map(|u| u.to_string()).ok(),
            None => Url::parse(href).map(|u| u.to_string()).ok(),
        };
        match absolute {
            Some(url) if !urls.contains(&url) => urls.push(url),
            Some(_) => {}
            None => tracing::debug!("Ignoring unresolvable link '{}' on {}", href, page_url),
        }
    }

    if urls.is_empty() {
        return Err(ExtractError::NoDocumentsFound(page_url.to_string()));
    }

    urls.sort_by_key(|url| hint_rank(url)); // stable, keeps page order within a rank
    tracing::debug!("Resolved {} XML documents from {}", urls.len(), page_url);
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIR: &str = "https://www.sec.gov/Archives/edgar/data/1067983/000095012323001234";

    #[test]
    fn collects_xml_links_as_absolute_urls() {
        let html = r#"<html><body><table>
            <tr><td><a href="/Archives/edgar/data/1067983/000095012323001234/49258.xml">49258.xml</a></td></tr>
            <tr><td><a href="primary_doc.xml">primary_doc.xml</a></td></tr>
            <tr><td><a href="0000950123-23-001234.txt">full submission</a></td></tr>
            <tr><td><a href="primary_doc.XML">dup case</a></td></tr>
            <tr><td><a href="primary_doc.xml">duplicate</a></td></tr>
        </table></body></html>"#;

        let urls = resolve_document_urls(html, DIR).unwrap();
        assert_eq!(
            urls,
            vec![
                format!("{DIR}/primary_doc.xml"),
                format!("{DIR}/primary_doc.XML"),
                format!("{DIR}/49258.xml"),
            ]
        );
    }

    #[test]
    fn filename_hints_only_reorder() {
        let html = r#"<a href="a.xml">a</a><a href="form13fInfoTable.xml">t</a><a href="primary_doc.xml">p</a>"#;
        let urls = resolve_document_urls(html, DIR).unwrap();
        let names: Vec<&str> = urls.iter().map(|u| u.rsplit('/').next().unwrap()).collect();
        assert_eq!(names, vec!["primary_doc.xml", "form13fInfoTable.xml", "a.xml"]);
    }

    #[test]
    fn page_without_xml_links_has_no_documents() {
        let html = r#"<html><body><a href="0000950123-23-001234.txt">txt</a></body></html>"#;
        assert_eq!(
            resolve_document_urls(html, DIR),
            Err(ExtractError::NoDocumentsFound(DIR.to_string()))
        );
    }
}
