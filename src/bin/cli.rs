//! TWINS announcement crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use twins_crawler::{
    error::Result,
    models::Config,
    parser, pipeline,
    services::PortalClient,
    storage::LocalStorage,
};

/// twins-crawler - TWINS announcement mirror
#[derive(Parser, Debug)]
#[command(
    name = "twins-crawler",
    version,
    about = "Mirrors TWINS student announcements into a snapshot and feeds"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Output directory (overrides `output.dir`)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch new announcements, update the snapshot and feeds
    Run,

    /// Re-render feeds from the stored snapshot
    Feeds,

    /// Run an extractor on a saved HTML page and print the result as JSON
    Parse {
        /// Which page layout the file holds
        #[arg(value_enum)]
        page: PageKind,

        /// Saved HTML file
        file: PathBuf,
    },

    /// Validate the configuration
    Validate,

    /// Show current snapshot info
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PageKind {
    Index,
    Detail,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }
    log::debug!("Loaded configuration from {}", cli.config.display());

    let storage = LocalStorage::from_config(&config.output);

    match cli.command {
        Command::Run => {
            config.validate()?;
            let portal = PortalClient::new(&config)?;
            let summary = pipeline::run_crawler(&config, &portal, &storage).await?;
            if summary.failed_count > 0 {
                log::warn!(
                    "{} announcements failed and will be retried next run",
                    summary.failed_count
                );
            }
        }

        Command::Feeds => {
            config.validate()?;
            let count = pipeline::render_feeds(&config, &storage).await?;
            log::info!(
                "Feeds written to {} ({} items)",
                storage.root_dir().display(),
                count
            );
        }

        Command::Parse { page, file } => {
            let html = std::fs::read_to_string(&file)?;
            let json = match page {
                PageKind::Index => serde_json::to_string_pretty(&parser::parse_index_page(&html)?)?,
                PageKind::Detail => {
                    serde_json::to_string_pretty(&parser::parse_detail_page(&html)?)?
                }
            };
            println!("{json}");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::info!("  Portal: {}", config.portal.index_url()?);
            log::info!("  Output: {}", config.output.dir.display());
        }

        Command::Info => {
            let path = storage.root_dir().join(&config.output.snapshot_file);
            log::info!("Snapshot: {}", path.display());

            let records = pipeline::load_snapshot(&path, &config.portal.base_url()?)?;
            if records.is_empty() {
                log::info!("No announcements stored yet.");
                return Ok(());
            }

            let files: usize = records.iter().map(|r| r.detail.file_items().count()).sum();
            let urls: usize = records.iter().map(|r| r.detail.url_items().count()).sum();
            log::info!("Announcements: {}", records.len());
            log::info!("Attachments: {} files, {} links", files, urls);
            if let Some(newest) = records.iter().map(|r| &r.page.date).max() {
                log::info!("Newest posting date: {}", newest);
            }
            if let Some(oldest) = records.iter().map(|r| &r.page.date).min() {
                log::info!("Oldest posting date: {}", oldest);
            }
            if let Some(last) = records.last() {
                log::info!("Last appended: {} ({})", last.page.title, last.page.id);
            }
        }
    }

    Ok(())
}
