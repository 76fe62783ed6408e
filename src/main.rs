//! # Darkhorse RSS
//!
//! Builds an RSS 2.0 feed for the Darkhorse Press "Top Story" category,
//! which publishes no feed of its own. Meant to run on a schedule (a CI
//! cron job) that commits the feed to a static site.
//!
//! ## Features
//!
//! - Discovers post URLs by paging through the category listing
//! - Scrapes title, author, publish date, body and featured image with
//!   layered selector heuristics
//! - Keeps a JSON state file so reruns only fetch unseen posts
//! - Never overwrites a good feed with an empty one when the site is down
//!
//! ## Usage
//!
//! ```sh
//! darkhorse_rss --max-pages 5 --recent 40 -o docs/darkhorse-top-story.xml
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: Walk listing pages for candidate post URLs
//! 2. **Scraping**: Fetch only URLs not seen on earlier runs
//! 3. **Selection**: Newest first, capped at `--recent`
//! 4. **Output**: Write the RSS feed, then the state file

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::SiteConfig;
use pipeline::{RunOptions, RunOutcome};
use scrapers::fetch::PageFetcher;
use utils::infer_repo_feed_url;

/// Resolve site settings: defaults, then the YAML file, then CLI overrides.
fn build_config(args: &Cli) -> Result<SiteConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SiteConfig::from_yaml_file(path)?,
        None => SiteConfig::default(),
    };
    if let Some(category_url) = &args.category_url {
        config.category_url = category_url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("darkhorse_rss starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = build_config(&args)?;
    let fetcher = PageFetcher::new(&config)?;

    let feed_url = args
        .feed_url
        .clone()
        .unwrap_or_else(|| infer_repo_feed_url(&args.output, Path::new(".git/config")));
    info!(%feed_url, category = %config.category_url, "Resolved feed settings");

    let options = RunOptions {
        max_pages: args.max_pages,
        recent: args.recent,
        output_path: args.output.clone(),
        state_path: args.state.clone(),
        feed_url,
        dry_run: args.dry_run,
    };

    let outcome = pipeline::run(&config, &options, &fetcher).await?;
    match &outcome {
        RunOutcome::NothingDiscovered | RunOutcome::NoItems => {
            info!(?outcome, "Run finished without publishing")
        }
        RunOutcome::DryRun { items } => info!(items, "Dry run finished"),
        RunOutcome::Published { items, new_posts } => {
            info!(items, new_posts, "Feed published")
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
