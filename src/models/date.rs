//! Timezone-free calendar dates and posting periods.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Calendar date rendered as zero-padded `YYYY-MM-DD`.
///
/// Values only come out of the date parser or from a stored snapshot whose
/// text already has the canonical shape, so string order is date order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalDate(String);

impl CanonicalDate {
    pub(crate) fn from_parts(year: u32, month: u32, day: u32) -> Self {
        Self(format!("{year:04}-{month:02}-{day:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_canonical(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
    }
}

impl TryFrom<String> for CanonicalDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_canonical(&value) {
            Ok(Self(value))
        } else {
            Err(format!("not a canonical YYYY-MM-DD date: {value:?}"))
        }
    }
}

impl From<CanonicalDate> for String {
    fn from(date: CanonicalDate) -> Self {
        date.0
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Posting period. `start <= end` is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: CanonicalDate,
    pub end: CanonicalDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_pads() {
        assert_eq!(CanonicalDate::from_parts(2025, 1, 4).as_str(), "2025-01-04");
        assert_eq!(CanonicalDate::from_parts(25, 12, 31).as_str(), "0025-12-31");
    }

    #[test]
    fn test_deserialize_rejects_loose_dates() {
        let ok: CanonicalDate = serde_json::from_str("\"2026-01-23\"").unwrap();
        assert_eq!(ok.as_str(), "2026-01-23");

        assert!(serde_json::from_str::<CanonicalDate>("\"2026/01/23\"").is_err());
        assert!(serde_json::from_str::<CanonicalDate>("\"2026-1-23\"").is_err());
    }

    #[test]
    fn test_ordering_follows_calendar() {
        let earlier = CanonicalDate::from_parts(2025, 12, 31);
        let later = CanonicalDate::from_parts(2026, 1, 1);
        assert!(earlier < later);
    }
}
