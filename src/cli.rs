//! Command-line interface definitions for the Darkhorse Top Story feed.
//!
//! This module defines the CLI arguments and options using the `clap` crate.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one scrape-and-publish run.
///
/// # Examples
///
/// ```sh
/// # Defaults: five listing pages, forty items
/// darkhorse_rss
///
/// # Custom paths and a preview run
/// darkhorse_rss -o public/feed.xml -s state/seen.json --dry-run
///
/// # Site settings from YAML, self link pinned
/// darkhorse_rss -c site.yaml --feed-url https://acme.github.io/feeds/top.xml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Number of category listing pages to scan
    #[arg(long, default_value_t = 5)]
    pub max_pages: usize,

    /// Number of recent items to keep in the feed
    #[arg(long, default_value_t = 40)]
    pub recent: usize,

    /// Output RSS feed path
    #[arg(short, long, default_value = "docs/darkhorse-top-story.xml")]
    pub output: PathBuf,

    /// State file path
    #[arg(short, long, default_value = "darkhorse-top-story.seen.json")]
    pub state: PathBuf,

    /// Optional path to a site config YAML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the category listing URL
    #[arg(long)]
    pub category_url: Option<String>,

    /// Public URL of the feed, used for the atom:link self reference
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Scrape and report without writing feed or state
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["darkhorse_rss"]);

        assert_eq!(cli.max_pages, 5);
        assert_eq!(cli.recent, 40);
        assert_eq!(cli.output, PathBuf::from("docs/darkhorse-top-story.xml"));
        assert_eq!(cli.state, PathBuf::from("darkhorse-top-story.seen.json"));
        assert!(cli.config.is_none());
        assert!(cli.category_url.is_none());
        assert!(cli.feed_url.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "darkhorse_rss",
            "--max-pages",
            "2",
            "--recent",
            "10",
            "--category-url",
            "https://darkhorsepressnow.com/category/news/",
            "--feed-url",
            "https://acme.github.io/feeds/top.xml",
            "--dry-run",
        ]);

        assert_eq!(cli.max_pages, 2);
        assert_eq!(cli.recent, 10);
        assert_eq!(
            cli.category_url.as_deref(),
            Some("https://darkhorsepressnow.com/category/news/")
        );
        assert_eq!(cli.feed_url.as_deref(), Some("https://acme.github.io/feeds/top.xml"));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "darkhorse_rss",
            "-o",
            "/tmp/feed.xml",
            "-s",
            "/tmp/seen.json",
            "-c",
            "/tmp/site.yaml",
        ]);

        assert_eq!(cli.output, PathBuf::from("/tmp/feed.xml"));
        assert_eq!(cli.state, PathBuf::from("/tmp/seen.json"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/site.yaml")));
    }
}
