//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable overriding `portal.base_url`.
pub const ENV_HOSTNAME: &str = "TWINS_HOSTNAME";
/// Environment variable overriding `crawler.user_agent`.
pub const ENV_USER_AGENT: &str = "USER_AGENT";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal location
    #[serde(default)]
    pub portal: PortalConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Output file layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Feed channel metadata
    #[serde(default)]
    pub feed: FeedConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `TWINS_HOSTNAME` and `USER_AGENT` overrides from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_HOSTNAME).ok(),
            std::env::var(ENV_USER_AGENT).ok(),
        );
    }

    fn apply_overrides(&mut self, hostname: Option<String>, user_agent: Option<String>) {
        if let Some(hostname) = hostname.filter(|h| !h.trim().is_empty()) {
            self.portal.base_url = hostname.trim().to_string();
        }
        if let Some(user_agent) = user_agent.filter(|u| !u.trim().is_empty()) {
            self.crawler.user_agent = user_agent;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self.portal.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(
                "portal.base_url must be an http(s) URL",
            ));
        }
        if !self.portal.index_path.starts_with('/') {
            return Err(AppError::validation(
                "portal.index_path must start with '/'",
            ));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent_attachments == 0 {
            return Err(AppError::validation(
                "crawler.max_concurrent_attachments must be > 0",
            ));
        }
        for (name, value) in [
            ("output.snapshot_file", &self.output.snapshot_file),
            ("output.rss_file", &self.output.rss_file),
            ("output.atom_file", &self.output.atom_file),
            ("output.json_feed_file", &self.output.json_feed_file),
            ("output.attachments_dir", &self.output.attachments_dir),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

/// Where the portal lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Scheme and host, e.g. `https://twins.tsukuba.ac.jp`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the announcement listing
    #[serde(default = "defaults::index_path")]
    pub index_path: String,
}

impl PortalConfig {
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn index_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join(&self.index_path)?)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            index_path: defaults::index_path(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between detail page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Concurrent attachment downloads within one detail page
    #[serde(default = "defaults::max_concurrent_attachments")]
    pub max_concurrent_attachments: usize,

    /// Abort the whole run when one detail page fails
    #[serde(default = "defaults::fail_fast")]
    pub fail_fast: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent_attachments: defaults::max_concurrent_attachments(),
            fail_fast: defaults::fail_fast(),
        }
    }
}

/// Output file layout, relative to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub dir: PathBuf,

    #[serde(default = "defaults::snapshot_file")]
    pub snapshot_file: String,

    #[serde(default = "defaults::rss_file")]
    pub rss_file: String,

    #[serde(default = "defaults::atom_file")]
    pub atom_file: String,

    #[serde(default = "defaults::json_feed_file")]
    pub json_feed_file: String,

    #[serde(default = "defaults::attachments_dir")]
    pub attachments_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            snapshot_file: defaults::snapshot_file(),
            rss_file: defaults::rss_file(),
            atom_file: defaults::atom_file(),
            json_feed_file: defaults::json_feed_file(),
            attachments_dir: defaults::attachments_dir(),
        }
    }
}

/// Feed channel metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "defaults::feed_title")]
    pub title: String,

    #[serde(default = "defaults::feed_description")]
    pub description: String,

    #[serde(default = "defaults::feed_generator")]
    pub generator: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: defaults::feed_title(),
            description: defaults::feed_description(),
            generator: defaults::feed_generator(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Portal defaults
    pub fn base_url() -> String {
        "https://twins.tsukuba.ac.jp".into()
    }
    pub fn index_path() -> String {
        "/campusweb/".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; twins-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn max_concurrent_attachments() -> usize {
        4
    }
    pub fn fail_fast() -> bool {
        true
    }

    // Output defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn snapshot_file() -> String {
        "output.json".into()
    }
    pub fn rss_file() -> String {
        "rss.xml".into()
    }
    pub fn atom_file() -> String {
        "atom.xml".into()
    }
    pub fn json_feed_file() -> String {
        "feed.json".into()
    }
    pub fn attachments_dir() -> String {
        "attachments".into()
    }

    // Feed defaults
    pub fn feed_title() -> String {
        "筑波大学TWINS 在学生へのお知らせ".into()
    }
    pub fn feed_description() -> String {
        "TWINS「在学生へのお知らせ」の新着情報".into()
    }
    pub fn feed_generator() -> String {
        "twins-announcements".into()
    }
}
