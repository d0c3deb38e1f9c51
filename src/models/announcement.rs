//! Announcement identity and listing rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::CanonicalDate;

/// Composite key of one announcement on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnouncementId {
    pub keijitype: u64,
    pub genrecd: u64,
    #[serde(rename = "seqNo")]
    pub seq_no: u64,
}

impl AnnouncementId {
    pub fn new(keijitype: u64, genrecd: u64, seq_no: u64) -> Self {
        Self {
            keijitype,
            genrecd,
            seq_no,
        }
    }
}

impl fmt::Display for AnnouncementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.keijitype, self.genrecd, self.seq_no)
    }
}

/// One row of the announcement listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Announcement title
    pub title: String,

    /// Portal identity
    pub id: AnnouncementId,

    /// Listing date
    pub date: CanonicalDate,
}
