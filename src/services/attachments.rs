// src/services/attachments.rs

//! Download file attachments and swap in their stored paths.

use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{AnnouncementId, Attachment, AttachmentItem, DetailRecord};
use crate::services::portal::{PortalClient, Session};
use crate::storage::SnapshotStorage;
use crate::utils::url::sanitize_filename;

/// Hex digits of the content hash kept in stored file names.
const HASH_PREFIX_LEN: usize = 16;

/// Resolves file attachments of one detail page into local paths.
pub struct AttachmentResolver<'a> {
    portal: &'a PortalClient,
    storage: &'a dyn SnapshotStorage,
    attachments_dir: &'a str,
    concurrency: usize,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(
        portal: &'a PortalClient,
        storage: &'a dyn SnapshotStorage,
        attachments_dir: &'a str,
        concurrency: usize,
    ) -> Self {
        Self {
            portal,
            storage,
            attachments_dir,
            concurrency: concurrency.max(1),
        }
    }

    /// Return `detail` with every file item pointing at its stored copy.
    ///
    /// Downloads of one page run concurrently; URL items are untouched and
    /// item order is kept.
    pub async fn resolve(
        &self,
        id: &AnnouncementId,
        detail: DetailRecord,
        session: &Session,
    ) -> Result<DetailRecord> {
        let DetailRecord {
            title,
            body,
            attachments,
            footer,
        } = detail;

        let mut resolved = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            resolved.push(match attachment {
                Attachment::File { items } => Attachment::File {
                    items: self.store_all(id, items, session).await?,
                },
                url @ Attachment::Url { .. } => url,
            });
        }

        Ok(DetailRecord {
            title,
            body,
            attachments: resolved,
            footer,
        })
    }

    async fn store_all(
        &self,
        id: &AnnouncementId,
        items: Vec<AttachmentItem>,
        session: &Session,
    ) -> Result<Vec<AttachmentItem>> {
        stream::iter(items)
            .map(|item| self.store_one(id, item, session))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn store_one(
        &self,
        id: &AnnouncementId,
        item: AttachmentItem,
        session: &Session,
    ) -> Result<AttachmentItem> {
        let bytes = self.portal.fetch_attachment(&item.location, session).await?;
        let key = attachment_key(self.attachments_dir, id, &item.title, &bytes);
        let stored = self.storage.write_attachment(&key, &bytes).await?;

        Ok(AttachmentItem {
            title: item.title,
            location: stored,
        })
    }
}

/// `{dir}/{id}/{sha256 prefix}_{title}`.
pub fn attachment_key(dir: &str, id: &AnnouncementId, title: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    format!(
        "{}/{id}/{}_{}",
        dir.trim_end_matches('/'),
        &digest[..HASH_PREFIX_LEN],
        sanitize_filename(title)
    )
}
