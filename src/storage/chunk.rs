// src/storage/chunk.rs
//
// The record sink rejects anything over a fixed byte ceiling, and a large
// manager's holdings table goes over it. Oversized records are split into
// ordered fragments sharing a correlation id; concatenating the payloads in
// sequence order gives back the original serialization byte for byte.

use crate::utils::error::StorageError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room reserved for the envelope on the first slicing attempt.
const ENVELOPE_ALLOWANCE: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFragment {
    pub correlation_id: String,
    pub external_id: String,
    pub sequence: usize,
    pub fragment_count: usize,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkedRecord {
    /// Serialized record that fits the ceiling as-is.
    Whole(String),
    Fragments(Vec<RecordFragment>),
}

/// Splits `text` into slices of at most `max_bytes`, never inside a UTF-8 sequence.
fn split_at_char_boundaries(text: &str, max_bytes: usize) -> Option<Vec<&str>> {
    let mut slices = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max_bytes).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            return None;
        }
        slices.push(&text[start..end]);
        start = end;
    }
    Some(slices)
}

/// Serializes `record` and chunks it if it does not fit `max_bytes`.
///
/// Escaping inside the envelope makes a fragment larger than its slice, so
/// every envelope is measured and the slice size shrunk until all fit.
pub fn chunk_record<T: Serialize>(
    external_id: &str,
    record: &T,
    max_bytes: usize,
) -> Result<ChunkedRecord, StorageError> {
    let serialized = serde_json::to_string(record)?;
    if serialized.len() <= max_bytes {
        return Ok(ChunkedRecord::Whole(serialized));
    }

    let correlation_id = Uuid::new_v4().to_string();
    let mut slice_size = max_bytes.saturating_sub(ENVELOPE_ALLOWANCE);

    loop {
        if slice_size == 0 {
            return Err(StorageError::CeilingTooSmall(max_bytes));
        }
        let slices = split_at_char_boundaries(&serialized, slice_size)
            .ok_or(StorageError::CeilingTooSmall(max_bytes))?;
        let fragment_count = slices.len();

        let fragments: Vec<RecordFragment> = slices
            .into_iter()
            .enumerate()
            .map(|(sequence, payload)| RecordFragment {
                correlation_id: correlation_id.clone(),
                external_id: external_id.to_string(),
                sequence,
                fragment_count,
                payload: payload.to_string(),
            })
            .collect();

        let mut largest = 0;
        for fragment in &fragments {
            largest = largest.max(serde_json::to_string(fragment)?.len());
        }
        if largest <= max_bytes {
            tracing::debug!(
                "{}: {} bytes split into {} fragments",
                external_id,
                serialized.len(),
                fragment_count
            );
            return Ok(ChunkedRecord::Fragments(fragments));
        }

        // Scale down by the observed overshoot; always shrink by at least one byte.
        let scaled = (slice_size as u128 * max_bytes as u128 / largest as u128) as usize;
        let next = scaled.min(slice_size - 1);
        tracing::trace!(
            "{}: envelope of {} bytes exceeds {}, retrying with slices of {}",
            external_id,
            largest,
            max_bytes,
            next
        );
        slice_size = next;
    }
}
