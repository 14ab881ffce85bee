// src/edgar/index.rs
//
// Full-index listing files (`master.idx`).
//
// The file is a free-text preamble of `Key: value` lines, a blank line, a
// header row naming the columns, a divider row of dashes, and then one
// delimited row per filing:
//
// ```text
// Description:           Master Index of EDGAR Dissemination Feed
// Last Data Received:    March 31, 2023
//
// CIK|Company Name|Form Type|Date Filed|Filename
// --------------------------------------------------------------------------------
// 1067983|BERKSHIRE HATHAWAY INC|13F-HR|2023-02-14|edgar/data/1067983/0000950123-23-001234.txt
// ```
//
// Parsing is lenient: short rows leave trailing columns absent, long rows are
// truncated to the header width. Only an empty body is an error.

use crate::utils::error::SourceError;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexFile {
    pub meta: HashMap<String, String>,
    pub entries: Vec<HashMap<String, String>>,
}

/// Removes control characters (including stray `\r` and form feeds).
fn printable(line: &str) -> String {
    line.chars().filter(|c| !c.is_control()).collect()
}

fn is_divider(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-' || c == '=')
}

pub fn parse_index(body: &str, delimiter: char) -> Result<IndexFile, SourceError> {
    if body.trim().is_empty() {
        return Err(SourceError::EmptyBody("listing file".to_string()));
    }

    let mut index = IndexFile::default();
    let mut in_preamble = true;
    let mut header: Option<Vec<String>> = None;

    for raw_line in body.lines() {
        let line = printable(raw_line);

        if in_preamble {
            if line.trim().is_empty() {
                in_preamble = false;
                continue;
            }
            match line.split_once(':') {
                Some((key, value)) => {
                    index.meta.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    index.meta.insert(line.trim().to_string(), String::new());
                }
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        match &header {
            None => {
                header = Some(line.split(delimiter).map(|c| c.trim().to_string()).collect());
            }
            Some(_) if is_divider(&line) => {}
            Some(columns) => {
                let row = columns
                    .iter()
                    .zip(line.split(delimiter))
                    .map(|(column, value)| (column.clone(), value.trim().to_string()))
                    .collect();
                index.entries.push(row);
            }
        }
    }

    tracing::debug!(
        "Parsed listing file: {} metadata keys, {} entries",
        index.meta.len(),
        index.entries.len()
    );
    Ok(index)
}
