//! Detail page records and attachments.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CanonicalDate, Period};

/// Header label of a file attachment table.
pub const FILE_HEADER: &str = "添付ファイル";
/// Header label of a URL attachment table.
pub const URL_HEADER: &str = "URL";

/// A single attachment link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentItem {
    pub title: String,

    /// Download reference for files, absolute URL for links
    #[serde(rename = "url")]
    pub location: String,
}

/// Kind of an attachment table, declared once by its header cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    Url,
}

impl AttachmentKind {
    /// Dispatch on the trimmed header text.
    pub fn from_header(text: &str) -> Result<Self> {
        match text {
            FILE_HEADER => Ok(Self::File),
            URL_HEADER => Ok(Self::Url),
            other => Err(AppError::structure(format!(
                "unknown attachment type: {other:?}"
            ))),
        }
    }

    pub fn with_items(self, items: Vec<AttachmentItem>) -> Attachment {
        match self {
            Self::File => Attachment::File { items },
            Self::Url => Attachment::Url { items },
        }
    }
}

/// One attachment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    File { items: Vec<AttachmentItem> },
    Url { items: Vec<AttachmentItem> },
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        match self {
            Self::File { .. } => AttachmentKind::File,
            Self::Url { .. } => AttachmentKind::Url,
        }
    }

    pub fn items(&self) -> &[AttachmentItem] {
        match self {
            Self::File { items } | Self::Url { items } => items,
        }
    }
}

/// Title line of a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailTitle {
    pub text: String,
    pub date: CanonicalDate,
}

/// Footer block: posting unit and posting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub affiliation: String,

    #[serde(rename = "subAffiliation", default)]
    pub sub_affiliation: String,

    pub period: Period,
}

impl Footer {
    /// `affiliation / subAffiliation`, or just the affiliation.
    pub fn display_affiliation(&self) -> String {
        if self.sub_affiliation.is_empty() {
            self.affiliation.clone()
        } else {
            format!("{} / {}", self.affiliation, self.sub_affiliation)
        }
    }
}

/// Everything extracted from one detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub title: DetailTitle,

    /// Free text body with line breaks as `\n`
    #[serde(rename = "contents")]
    pub body: String,

    pub attachments: Vec<Attachment>,

    pub footer: Footer,
}

impl DetailRecord {
    /// Items of all file tables, in document order.
    pub fn file_items(&self) -> impl Iterator<Item = &AttachmentItem> {
        self.items_of(AttachmentKind::File)
    }

    /// Items of all URL tables, in document order.
    pub fn url_items(&self) -> impl Iterator<Item = &AttachmentItem> {
        self.items_of(AttachmentKind::Url)
    }

    fn items_of(&self, kind: AttachmentKind) -> impl Iterator<Item = &AttachmentItem> {
        self.attachments
            .iter()
            .filter(move |a| a.kind() == kind)
            .flat_map(|a| a.items().iter())
    }
}
