//! Run orchestration: load state, discover, scrape, merge, publish.
//!
//! One call to [`run`] is one scheduled execution. The steps are:
//!
//! 1. Load the state file (a corrupt file degrades to empty state)
//! 2. Discover post URLs from the listing pages
//! 3. Scrape only the URLs not seen on a previous run
//! 4. Rebuild the feed from the live listing, newest first, capped at
//!    `recent`
//! 5. Write the feed and the updated state
//!
//! Steps 2 and 4 can come up empty (site outage, markup change). In that
//! case nothing is written and the previous feed stays published.

use crate::config::SiteConfig;
use crate::models::PostItem;
use crate::outputs::rss::write_rss;
use crate::outputs::state::{StateDocument, load_state, merge_seen_urls, save_state};
use crate::scrapers::dates::{format_iso, parse_datetime_str};
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::listing::discover_listing_urls;
use crate::scrapers::post::scrape_post;
use crate::scrapers::urls::normalize_post_url;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use url::Url;

/// Per-invocation settings, mostly straight from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Listing pages to scan.
    pub max_pages: usize,
    /// Feed size; values below 1 are treated as 1.
    pub recent: usize,
    pub output_path: PathBuf,
    pub state_path: PathBuf,
    /// `atom:link rel="self"` target.
    pub feed_url: String,
    /// Scrape but write nothing.
    pub dry_run: bool,
}

/// How a run ended. Every variant is a successful exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The listing produced no URLs; outputs untouched.
    NothingDiscovered,
    /// No discovered URL had a usable record; outputs untouched.
    NoItems,
    /// Dry run; outputs untouched.
    DryRun { items: usize },
    /// Feed and state were written.
    Published { items: usize, new_posts: usize },
}

/// Sort key: publish time (unparsable counts as the epoch) then link, both
/// descending.
pub fn sort_items_newest_first(mut items: Vec<PostItem>) -> Vec<PostItem> {
    let key = |item: &PostItem| {
        parse_datetime_str(&item.pub_dt_iso).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    };
    items.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| b.link.cmp(&a.link)));
    items
}

/// Cached records for the discovered URLs, in listing order, then sorted
/// and truncated to `recent`.
pub fn select_feed_items(
    discovered: &[String],
    cache: &HashMap<String, PostItem>,
    recent: usize,
) -> Vec<PostItem> {
    let listed: Vec<PostItem> = discovered
        .iter()
        .filter_map(|url| cache.get(url).cloned())
        .collect();
    let mut sorted = sort_items_newest_first(listed);
    sorted.truncate(recent.max(1));
    sorted
}

/// Item cache seeded from persisted records, keyed by canonical link.
///
/// Hand-edited state may carry non-canonical links; both the key and the
/// record's `link`/`guid` are normalized.
pub fn seed_item_cache(
    items: &BTreeMap<String, PostItem>,
    base: &Url,
) -> HashMap<String, PostItem> {
    items
        .iter()
        .map(|(key, item)| {
            let raw = if item.link.is_empty() { key } else { &item.link };
            let link = normalize_post_url(raw, base);
            let record = PostItem {
                link: link.clone(),
                guid: link.clone(),
                ..item.clone()
            };
            (link, record)
        })
        .collect()
}

/// Execute one full run.
///
/// Page and post fetch failures are logged and absorbed. The returned
/// error covers only configuration problems and local I/O failures.
#[instrument(
    level = "info",
    skip_all,
    fields(max_pages = options.max_pages, recent = options.recent, dry_run = options.dry_run)
)]
pub async fn run(
    config: &SiteConfig,
    options: &RunOptions,
    fetcher: &PageFetcher,
) -> Result<RunOutcome, Box<dyn Error>> {
    let base = config.base()?;
    let prior = load_state(&options.state_path).await?;

    let discovered: Vec<String> = discover_listing_urls(fetcher, config, options.max_pages)
        .await?
        .iter()
        .map(|url| normalize_post_url(url, &base))
        .unique()
        .collect();
    if discovered.is_empty() {
        warn!("No URLs discovered from listing pages. Existing feed/state will be preserved.");
        return Ok(RunOutcome::NothingDiscovered);
    }

    let seen: HashSet<&str> = prior.seen_urls.iter().map(String::as_str).collect();
    let new_urls: Vec<&String> = discovered
        .iter()
        .filter(|url| !seen.contains(url.as_str()))
        .collect();
    info!(discovered = discovered.len(), new = new_urls.len(), "Partitioned listing URLs");

    let mut cache = seed_item_cache(&prior.items, &base);

    let mut scraped = 0usize;
    for (idx, url) in new_urls.iter().enumerate() {
        if idx > 0 {
            sleep(config.request_delay()).await;
        }
        info!(n = idx + 1, of = new_urls.len(), %url, "Scraping new post");
        match scrape_post(fetcher, url).await {
            Some(item) => {
                scraped += 1;
                cache.insert(item.link.clone(), item);
            }
            None => warn!(%url, "Skipping failed post scrape"),
        }
    }

    let feed_items = select_feed_items(&discovered, &cache, options.recent);
    if feed_items.is_empty() {
        warn!("No feed items available after scrape. Existing feed/state will be preserved.");
        return Ok(RunOutcome::NoItems);
    }

    let next_state = StateDocument {
        seen_urls: merge_seen_urls(&discovered, &prior.seen_urls, options.recent),
        items: feed_items
            .iter()
            .map(|item| (item.link.clone(), item.clone()))
            .collect::<BTreeMap<_, _>>(),
        last_run_utc: Some(format_iso(&Utc::now())),
    };

    if options.dry_run {
        info!(
            items = feed_items.len(),
            path = %options.output_path.display(),
            "Dry run enabled. Feed would be written"
        );
        info!(
            seen = next_state.seen_urls.len(),
            path = %options.state_path.display(),
            "Dry run enabled. State would be written"
        );
        return Ok(RunOutcome::DryRun {
            items: feed_items.len(),
        });
    }

    write_rss(&options.output_path, config, &feed_items, &options.feed_url).await?;
    save_state(&options.state_path, &next_state).await?;
    info!(
        items = feed_items.len(),
        new_posts = scraped,
        feed = %options.output_path.display(),
        state = %options.state_path.display(),
        "Published feed"
    );

    Ok(RunOutcome::Published {
        items: feed_items.len(),
        new_posts: scraped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(link: &str, pub_dt_iso: &str) -> PostItem {
        PostItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            guid: link.to_string(),
            pub_date: String::new(),
            pub_dt_iso: pub_dt_iso.to_string(),
            author: String::new(),
            summary: "summary".to_string(),
            content_html: None,
            image_url: None,
        }
    }

    #[test]
    fn test_sort_newest_first_with_unparsable_last() {
        let items = vec![
            item("https://d.com/a/t1", "2026-01-01T00:00:00+00:00"),
            item("https://d.com/a/bad", "not a date"),
            item("https://d.com/a/t3", "2026-03-01T00:00:00+00:00"),
            item("https://d.com/a/t2", "2026-02-01T00:00:00+00:00"),
        ];
        let links: Vec<String> = sort_items_newest_first(items)
            .into_iter()
            .map(|i| i.link)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://d.com/a/t3",
                "https://d.com/a/t2",
                "https://d.com/a/t1",
                "https://d.com/a/bad",
            ]
        );
    }

    #[test]
    fn test_sort_ties_break_on_link_descending() {
        let same = "2026-01-01T00:00:00+00:00";
        let links: Vec<String> = sort_items_newest_first(vec![
            item("https://d.com/a/alpha", same),
            item("https://d.com/a/zulu", same),
        ])
        .into_iter()
        .map(|i| i.link)
        .collect();
        assert_eq!(links, vec!["https://d.com/a/zulu", "https://d.com/a/alpha"]);
    }

    #[test]
    fn test_select_feed_items_drops_unlisted_and_uncached() {
        let mut cache = HashMap::new();
        for (link, ts) in [
            ("https://d.com/a/listed", "2026-01-02T00:00:00+00:00"),
            ("https://d.com/a/stale", "2026-01-03T00:00:00+00:00"),
            ("https://d.com/a/older", "2026-01-01T00:00:00+00:00"),
        ] {
            cache.insert(link.to_string(), item(link, ts));
        }
        let discovered = vec![
            "https://d.com/a/older".to_string(),
            "https://d.com/a/failed".to_string(),
            "https://d.com/a/listed".to_string(),
        ];

        let selected = select_feed_items(&discovered, &cache, 40);
        let links: Vec<&str> = selected.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://d.com/a/listed", "https://d.com/a/older"]);

        assert_eq!(select_feed_items(&discovered, &cache, 0).len(), 1);
    }

    #[test]
    fn test_seed_item_cache_canonicalizes_hand_edited_links() {
        let base = Url::parse("https://darkhorsepressnow.com").unwrap();
        let mut items = BTreeMap::new();
        items.insert(
            "https://darkhorsepressnow.com/news/edited-story/".to_string(),
            item(
                "https://darkhorsepressnow.com//news/edited-story/",
                "2026-02-18T00:00:00+00:00",
            ),
        );
        let mut keyed_only = item("", "2026-02-17T00:00:00+00:00");
        keyed_only.guid = String::new();
        items.insert("/news/keyed-only/".to_string(), keyed_only);

        let cache = seed_item_cache(&items, &base);

        let edited = &cache["https://darkhorsepressnow.com/news/edited-story"];
        assert_eq!(edited.link, "https://darkhorsepressnow.com/news/edited-story");
        assert_eq!(edited.guid, edited.link);
        let keyed = &cache["https://darkhorsepressnow.com/news/keyed-only"];
        assert_eq!(keyed.link, "https://darkhorsepressnow.com/news/keyed-only");
    }

    fn config_for(server: &MockServer) -> SiteConfig {
        SiteConfig {
            base_url: server.uri(),
            category_url: format!("{}/category/news/top-story/", server.uri()),
            request_delay_ms: 0,
            request_timeout_secs: 5,
            ..SiteConfig::default()
        }
    }

    fn options(dir: &std::path::Path) -> RunOptions {
        RunOptions {
            max_pages: 2,
            recent: 40,
            output_path: dir.join("docs/feed.xml"),
            state_path: dir.join("state.json"),
            feed_url: "https://acme.github.io/feed/feed.xml".to_string(),
            dry_run: false,
        }
    }

    fn post_page(title: &str, datetime: &str) -> String {
        format!(
            r#"<html><head><meta property="og:title" content="{title}"></head>
            <body><article><time datetime="{datetime}"></time>
            <div class="entry-content"><p>{title} body paragraph with enough text.</p></div>
            </article></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_empty_discovery_leaves_outputs_byte_identical() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        std::fs::create_dir_all(opts.output_path.parent().unwrap()).unwrap();
        let prior_feed = "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel/></rss>";
        let prior_state = r#"{"items": {}, "last_run_utc": "2026-01-01T00:00:00+00:00", "seen_urls": ["https://darkhorsepressnow.com/old/stale-post"]}"#;
        std::fs::write(&opts.output_path, prior_feed).unwrap();
        std::fs::write(&opts.state_path, prior_state).unwrap();

        let config = config_for(&server);
        let fetcher = PageFetcher::new(&config).unwrap();
        let outcome = run(&config, &opts, &fetcher).await.unwrap();

        assert_eq!(outcome, RunOutcome::NothingDiscovered);
        assert_eq!(std::fs::read_to_string(&opts.output_path).unwrap(), prior_feed);
        assert_eq!(std::fs::read_to_string(&opts.state_path).unwrap(), prior_state);
    }

    #[tokio::test]
    async fn test_full_run_scrapes_only_new_posts_and_persists() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/category/news/top-story/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                <article><h2><a href="/news/fresh-story/">Fresh</a></h2></article>
                <article><h2><a href="/news/cached-story/">Cached</a></h2></article>
                <article><h2><a href="/news/broken-story/">Broken</a></h2></article>
                </body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/category/news/top-story/page/2/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/fresh-story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(post_page("Fresh Story", "2026-02-18T12:00:00+00:00")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/cached-story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(post_page("Refetched", "2026-02-19T00:00:00+00:00")),
            )
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/broken-story"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let fresh = format!("{uri}/news/fresh-story");
        let cached = format!("{uri}/news/cached-story");
        let broken = format!("{uri}/news/broken-story");

        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        let cached_item = item(&cached, "2026-02-10T00:00:00+00:00");
        let prior_state = serde_json::json!({
            "seen_urls": [cached.clone(), "https://darkhorsepressnow.com/old/post"],
            "items": { format!("{cached}/"): cached_item.as_state() },
            "last_run_utc": "2026-02-10T00:00:00+00:00"
        });
        std::fs::write(&opts.state_path, prior_state.to_string()).unwrap();

        let config = config_for(&server);
        let fetcher = PageFetcher::new(&config).unwrap();
        let outcome = run(&config, &opts, &fetcher).await.unwrap();

        assert_eq!(outcome, RunOutcome::Published { items: 2, new_posts: 1 });

        let state = load_state(&opts.state_path).await.unwrap();
        assert_eq!(
            state.seen_urls,
            vec![
                fresh.clone(),
                cached.clone(),
                broken.clone(),
                "https://darkhorsepressnow.com/old/post".to_string(),
            ]
        );
        assert_eq!(
            state.items.keys().cloned().collect::<Vec<_>>(),
            vec![cached.clone(), fresh.clone()]
        );
        assert_eq!(state.items[&fresh].title, "Fresh Story");
        assert!(state.last_run_utc.is_some());

        let feed = std::fs::read_to_string(&opts.output_path).unwrap();
        let fresh_at = feed.find("<title>Fresh Story</title>").unwrap();
        let cached_at = feed.find(&format!("<link>{cached}</link>")).unwrap();
        assert!(fresh_at < cached_at, "newest item should come first");
        assert!(!feed.contains("broken-story"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/news/top-story/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<article><h2><a href="/news/only-story/">Only</a></h2></article>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/only-story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(post_page("Only Story", "2026-02-18T12:00:00+00:00")),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            max_pages: 1,
            dry_run: true,
            ..options(dir.path())
        };
        let config = config_for(&server);
        let fetcher = PageFetcher::new(&config).unwrap();

        let outcome = run(&config, &opts, &fetcher).await.unwrap();
        assert_eq!(outcome, RunOutcome::DryRun { items: 1 });
        assert!(!opts.output_path.exists());
        assert!(!opts.state_path.exists());
    }

    #[tokio::test]
    async fn test_all_scrapes_failing_preserves_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/news/top-story/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<article><h2><a href="/news/dead-story/">Dead</a></h2></article>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/dead-story"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            max_pages: 1,
            ..options(dir.path())
        };
        let config = config_for(&server);
        let fetcher = PageFetcher::new(&config).unwrap();

        assert_eq!(run(&config, &opts, &fetcher).await.unwrap(), RunOutcome::NoItems);
        assert!(!opts.output_path.exists());
        assert!(!opts.state_path.exists());
    }
}
