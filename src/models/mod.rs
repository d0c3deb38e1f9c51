// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod announcement;
mod config;
mod date;
mod detail;
mod output;

// Re-export all public types
pub use announcement::{AnnouncementId, IndexRecord};
pub use config::{Config, CrawlerConfig, FeedConfig, OutputConfig, PortalConfig};
pub use date::{CanonicalDate, Period};
pub use detail::{
    Attachment, AttachmentItem, AttachmentKind, DetailRecord, DetailTitle, FILE_HEADER, Footer,
    URL_HEADER,
};
pub use output::OutputRecord;

pub(crate) use output::StoredRecord;
