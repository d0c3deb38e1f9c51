//! Service layer for the crawler application.
//!
//! This module contains the collaborators around the extraction core:
//! - Portal access (`PortalClient`)
//! - Attachment download and storage (`AttachmentResolver`)

mod attachments;
mod portal;

pub use attachments::{AttachmentResolver, attachment_key};
pub use portal::{DetailPage, PortalClient, Session};
