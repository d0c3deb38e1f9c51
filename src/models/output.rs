//! Persisted announcement record.
//!
//! A record read back from the snapshot keeps its stored JSON object, and
//! that object is what gets written again. Typed fields are a read-only view
//! used for identities and feeds, so history is never reformatted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DetailRecord, IndexRecord};
use crate::parser::date::to_utc_instant;
use crate::utils::url::announcement_url;

/// Unit of persistence and feed emission. Never rewritten once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub page: IndexRecord,

    pub detail: DetailRecord,

    /// Public link to the announcement
    pub url: String,

    pub updated_at: DateTime<Utc>,

    /// `updated` as written, e.g. with milliseconds
    updated: String,

    /// Stored object for records read from a snapshot
    stored: Option<Map<String, Value>>,
}

/// Field layout of a freshly created record.
#[derive(Serialize)]
struct FreshRecord<'a> {
    page: &'a IndexRecord,
    #[serde(rename = "parsedDetailPage")]
    detail: &'a DetailRecord,
    url: &'a str,
    updated: &'a str,
}

impl OutputRecord {
    /// Fold a freshly fetched announcement into a record.
    ///
    /// `detail` must already carry resolved attachment locations.
    pub fn new(page: IndexRecord, detail: DetailRecord, base_url: &Url) -> Result<Self> {
        let url = announcement_url(base_url, &page.id)?;
        let updated_at = to_utc_instant(&page.date)?;
        Ok(Self {
            page,
            detail,
            url,
            updated: rfc3339(&updated_at),
            updated_at,
            stored: None,
        })
    }

    /// Stable feed identifier.
    pub fn feed_id(&self) -> String {
        let id = &self.page.id;
        format!("twins-{}-{}-{}", id.keijitype, id.genrecd, id.seq_no)
    }

    /// `updated` exactly as persisted.
    pub fn updated_text(&self) -> &str {
        &self.updated
    }

    /// Whether this record came out of a stored snapshot.
    pub fn is_stored(&self) -> bool {
        self.stored.is_some()
    }
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.stored {
            Some(object) => object.serialize(serializer),
            None => FreshRecord {
                page: &self.page,
                detail: &self.detail,
                url: &self.url,
                updated: &self.updated,
            }
            .serialize(serializer),
        }
    }
}

fn rfc3339(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Typed view of a stored object, tolerant of records written before
/// `url`/`updated` existed.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredRecord {
    page: IndexRecord,

    #[serde(rename = "parsedDetailPage", alias = "detail")]
    detail: DetailRecord,

    #[serde(default)]
    url: Option<String>,

    #[serde(default, alias = "updatedAt")]
    updated: Option<String>,
}

impl StoredRecord {
    /// Read one stored object. A missing `url` is derived and added to it;
    /// everything else in the object stays as stored.
    pub(crate) fn from_stored(object: Map<String, Value>, base_url: &Url) -> Result<OutputRecord> {
        let typed = StoredRecord::deserialize(&Value::Object(object.clone()))?;
        let mut object = object;

        let url = match typed.url {
            Some(url) => url,
            None => {
                let url = announcement_url(base_url, &typed.page.id)?;
                object.insert("url".to_string(), Value::String(url.clone()));
                url
            }
        };

        let (updated_at, updated) = match typed.updated {
            Some(text) => {
                let at = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| AppError::format(format!("updated {text:?}: {e}")))?
                    .with_timezone(&Utc);
                (at, text)
            }
            None => {
                let at = to_utc_instant(&typed.page.date)?;
                (at, rfc3339(&at))
            }
        };

        Ok(OutputRecord {
            page: typed.page,
            detail: typed.detail,
            url,
            updated_at,
            updated,
            stored: Some(object),
        })
    }
}
