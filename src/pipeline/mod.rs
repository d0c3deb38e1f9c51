//! Pipeline entry points for crawler operations.
//!
//! - `diff`: partition the listing against the snapshot and merge
//! - `feeds`: render RSS, Atom and JSON Feed documents
//! - `run_crawler`: fetch new announcements and republish everything
//! - `render_feeds`: republish from the stored snapshot only

pub mod crawl;
pub mod diff;
pub mod feeds;

pub use crawl::{CrawlSummary, render_feeds, run_crawler};
pub use diff::{Partition, decode_snapshot, load_snapshot, merge, partition};
