// src/pipeline/crawl.rs

//! Incremental crawl run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, IndexRecord, OutputRecord};
use crate::parser::{parse_detail_page, parse_index_page};
use crate::pipeline::diff::{self, Partition};
use crate::pipeline::feeds::{self, Channel};
use crate::services::{AttachmentResolver, PortalClient};
use crate::storage::SnapshotStorage;
use crate::utils::log;

const TOTAL_STEPS: usize = 5;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Rows in the fetched listing
    pub index_count: usize,
    /// Records already stored before the run
    pub known_count: usize,
    /// Identities classified new
    pub new_count: usize,
    /// New identities skipped after a failure
    pub failed_count: usize,
    /// Records in the written snapshot
    pub total_count: usize,
}

/// Run one incremental crawl: fetch only what is new, append it, republish.
///
/// Detail pages are fetched one identity at a time with
/// `crawler.request_delay_ms` between them. An aborted run leaves the
/// snapshot and feeds untouched, but attachments stored for announcements
/// fetched before the failure stay on disk.
pub async fn run_crawler(
    config: &Config,
    portal: &PortalClient,
    storage: &dyn SnapshotStorage,
) -> Result<CrawlSummary> {
    log::header("TWINS announcement crawl");

    log::step(1, TOTAL_STEPS, "Loading snapshot");
    let raw = storage.read_snapshot().await?;
    let snapshot = diff::decode_snapshot(raw.as_deref(), portal.base_url())?;
    log::sub_item(&format!("{} stored records", snapshot.len()));

    log::step(2, TOTAL_STEPS, "Fetching announcement listing");
    let html = portal.fetch_index().await?;
    let index = parse_index_page(&html)?;
    let index_count = index.len();
    log::sub_item(&format!("{index_count} rows in listing"));

    log::step(3, TOTAL_STEPS, "Detecting new announcements");
    let Partition { known, new } = diff::partition(index, snapshot);
    let mut summary = CrawlSummary {
        index_count,
        known_count: known.len(),
        new_count: new.len(),
        ..CrawlSummary::default()
    };
    log::sub_item(&format!("{} new, {} known", new.len(), known.len()));

    log::step(4, TOTAL_STEPS, "Fetching new announcements");
    let (fetched, failed) = fetch_new(config, portal, storage, new).await?;
    summary.failed_count = failed;

    log::step(5, TOTAL_STEPS, "Writing snapshot and feeds");
    let merged = diff::merge(known, fetched);
    storage.write_snapshot(&merged).await?;
    write_feeds(config, storage, &merged, Utc::now()).await?;
    summary.total_count = merged.len();

    log::summary(
        "Crawl complete",
        &[
            ("Listing rows", summary.index_count.to_string()),
            ("Known", summary.known_count.to_string()),
            ("New", summary.new_count.to_string()),
            ("Failed", summary.failed_count.to_string()),
            ("Total stored", summary.total_count.to_string()),
        ],
    );

    Ok(summary)
}

/// Re-render the feeds from the stored snapshot without touching the portal.
pub async fn render_feeds(config: &Config, storage: &dyn SnapshotStorage) -> Result<usize> {
    let raw = storage.read_snapshot().await?;
    let records = diff::decode_snapshot(raw.as_deref(), &config.portal.base_url()?)?;
    write_feeds(config, storage, &records, Utc::now()).await?;
    log::sub_item(&format!("Feeds rendered for {} records", records.len()));
    Ok(records.len())
}

/// Fetch, extract and resolve every new identity in listing order.
///
/// Returns the fetched records and the number of skipped identities.
async fn fetch_new(
    config: &Config,
    portal: &PortalClient,
    storage: &dyn SnapshotStorage,
    new: Vec<IndexRecord>,
) -> Result<(Vec<OutputRecord>, usize)> {
    let delay = Duration::from_millis(config.crawler.request_delay_ms);
    let resolver = AttachmentResolver::new(
        portal,
        storage,
        &config.output.attachments_dir,
        config.crawler.max_concurrent_attachments,
    );

    let total = new.len();
    let mut fetched = Vec::with_capacity(total);
    let mut failed = 0;

    for (i, page) in new.into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let id = page.id;
        log::sub_item(&format!("[{}/{total}] {id} {}", i + 1, page.title));

        match fetch_one(portal, &resolver, page).await {
            Ok(record) => fetched.push(record),
            Err(e) if config.crawler.fail_fast => {
                ::log::error!("Announcement {id} failed, aborting run: {e}");
                return Err(e);
            }
            Err(e) => {
                failed += 1;
                if e.is_extraction() {
                    ::log::warn!("Detail page layout changed for {id}: {e}");
                }
                ::log::warn!("Skipping announcement {id}, will retry next run: {e}");
            }
        }
    }

    Ok((fetched, failed))
}

async fn fetch_one(
    portal: &PortalClient,
    resolver: &AttachmentResolver<'_>,
    page: IndexRecord,
) -> Result<OutputRecord> {
    let fetched = portal.fetch_detail(&page.id).await?;
    let detail = parse_detail_page(&fetched.html)?;
    let detail = resolver.resolve(&page.id, detail, &fetched.session).await?;
    OutputRecord::new(page, detail, portal.base_url())
}

async fn write_feeds(
    config: &Config,
    storage: &dyn SnapshotStorage,
    records: &[OutputRecord],
    now: DateTime<Utc>,
) -> Result<()> {
    let channel = Channel::from_config(config)?;
    let rendered = feeds::render_all(records, &channel, now)?;

    let output = &config.output;
    storage.write_feed(&output.rss_file, &rendered.rss).await?;
    storage.write_feed(&output.atom_file, &rendered.atom).await?;
    storage
        .write_feed(&output.json_feed_file, &rendered.json)
        .await?;
    Ok(())
}
