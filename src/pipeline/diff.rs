//! Incremental diff and append-only merge.
//!
//! The stored snapshot only ever grows: records already present are kept
//! byte for byte as stored, even if the listing now shows a different title or
//! date for them, and new announcements are appended in listing order.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AnnouncementId, IndexRecord, OutputRecord, StoredRecord};

/// Result of comparing a fresh listing against the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Every stored record, in stored order
    pub known: Vec<OutputRecord>,
    /// Listing rows whose identity is not stored yet, in listing order
    pub new: Vec<IndexRecord>,
}

impl Partition {
    /// Check if there is anything to fetch.
    pub fn has_new(&self) -> bool {
        !self.new.is_empty()
    }
}

/// Decode a stored snapshot.
///
/// `None` means nothing was stored yet. Bytes that do not decode are a
/// persistence error, never an empty snapshot.
pub fn decode_snapshot(raw: Option<&[u8]>, base_url: &Url) -> Result<Vec<OutputRecord>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let stored: Vec<Value> = serde_json::from_slice(raw)
        .map_err(|e| AppError::persistence(format!("snapshot is not valid: {e}")))?;

    stored
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(object) => StoredRecord::from_stored(object, base_url),
            other => Err(AppError::format(format!("record {i} is not an object: {other}"))),
        })
        .collect::<Result<Vec<_>>>()
        .map_err(|e| AppError::persistence(format!("snapshot record is not valid: {e}")))
}

/// Read and decode the snapshot at `path`; a missing file is an empty snapshot.
pub fn load_snapshot(path: &Path, base_url: &Url) -> Result<Vec<OutputRecord>> {
    match std::fs::read(path) {
        Ok(bytes) => decode_snapshot(Some(&bytes), base_url),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Split the listing into stored and new announcements.
///
/// Identities repeated within the listing are classified once, at their
/// first position.
pub fn partition(index: Vec<IndexRecord>, snapshot: Vec<OutputRecord>) -> Partition {
    let mut seen: HashSet<AnnouncementId> = snapshot.iter().map(|r| r.page.id).collect();

    let new = index
        .into_iter()
        .filter(|record| seen.insert(record.id))
        .collect();

    Partition {
        known: snapshot,
        new,
    }
}

/// Stored records first, untouched, then the newly fetched ones in fetch order.
pub fn merge(known: Vec<OutputRecord>, fetched: Vec<OutputRecord>) -> Vec<OutputRecord> {
    let mut merged = known;
    merged.extend(fetched);
    merged
}
