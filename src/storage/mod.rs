//! Storage abstractions for snapshot, feed and attachment persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── output.json           # Append-only snapshot of every announcement
//! ├── rss.xml               # RSS 2.0
//! ├── atom.xml              # Atom 1.0
//! ├── feed.json             # JSON Feed 1.1
//! └── attachments/
//!     └── {keijitype}-{genrecd}-{seqNo}/
//!         └── {sha256 prefix}_{title}
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::OutputRecord;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for output storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Raw snapshot bytes, or `None` when nothing has been stored yet.
    async fn read_snapshot(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the snapshot with the merged record list.
    async fn write_snapshot(&self, records: &[OutputRecord]) -> Result<()>;

    /// Write one rendered feed document.
    async fn write_feed(&self, name: &str, content: &str) -> Result<()>;

    /// Store attachment bytes under a relative key and return the stored path.
    async fn write_attachment(&self, key: &str, bytes: &[u8]) -> Result<String>;
}
