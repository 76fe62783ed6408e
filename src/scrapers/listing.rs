//! Category listing discovery.
//!
//! Walks `category/`, `category/page/2/`, … and collects candidate post
//! URLs in first-seen order.
//!
//! Pagination stops at the first page (after page 1) that contributes no
//! new URL. That conflates "ran past the last page" with "this page only
//! repeated links we already have", which is a heuristic and not a true
//! end-of-listing signal.

use crate::config::SiteConfig;
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::html::selector;
use crate::scrapers::urls::{looks_like_post_url, normalize_post_url};
use crate::utils::truncate_for_log;
use scraper::Html;
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{debug, info, instrument};
use url::Url;

/// Anchors in post headings, across the themes the site has used.
const HEADING_LINK_SELECTORS: [&str; 6] = [
    "article h1 a[href]",
    "article h2 a[href]",
    "article h3 a[href]",
    ".entry-title a[href]",
    ".post-title a[href]",
    ".td-module-title a[href]",
];

/// Extract normalized, deduplicated post URLs from one listing page.
///
/// Anchors from every heading selector are gathered; only when none match
/// does the page fall back to all `a[href]`.
pub fn extract_post_urls_from_listing(html: &str, base: &Url, site_host: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let mut hrefs: Vec<String> = HEADING_LINK_SELECTORS
        .iter()
        .filter_map(|css| selector(css))
        .flat_map(|sel| {
            document
                .select(&sel)
                .filter_map(|a| a.value().attr("href").map(str::to_string))
                .collect::<Vec<_>>()
        })
        .collect();

    if hrefs.is_empty() {
        if let Some(all_anchors) = selector("a[href]") {
            hrefs = document
                .select(&all_anchors)
                .filter_map(|a| a.value().attr("href").map(str::to_string))
                .collect();
        }
    }

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for href in hrefs {
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        let normalized = normalize_post_url(href, base);
        if !looks_like_post_url(&normalized, site_host) {
            continue;
        }
        if seen.insert(normalized.clone()) {
            urls.push(normalized);
        }
    }
    urls
}

/// URL of listing page `page_num` (1-based).
fn listing_page_url(category: &Url, page_num: usize) -> Result<Url, url::ParseError> {
    if page_num <= 1 {
        return Ok(category.clone());
    }
    let mut dir = category.clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir.join(&format!("page/{page_num}/"))
}

/// Scan up to `max_pages` listing pages and return the discovered post
/// URLs in first-seen order.
///
/// A page that fails to load is skipped and scanning continues with the
/// next page index. Only invalid configured URLs are an error.
#[instrument(level = "info", skip_all, fields(category = %config.category_url, max_pages = max_pages))]
pub async fn discover_listing_urls(
    fetcher: &PageFetcher,
    config: &SiteConfig,
    max_pages: usize,
) -> Result<Vec<String>, url::ParseError> {
    let category = config.category()?;
    let base = config.base()?;
    let site_host = config.site_host();

    let mut discovered: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for page_num in 1..=max_pages {
        if page_num > 1 {
            sleep(config.request_delay()).await;
        }

        let page_url = listing_page_url(&category, page_num)?;
        info!(page = page_num, url = %page_url, "Scanning listing page");
        let Some(html) = fetcher.fetch_html_or_warn(page_url.as_str()).await else {
            continue;
        };

        let new_urls: Vec<String> = extract_post_urls_from_listing(&html, &base, &site_host)
            .into_iter()
            .filter(|url| !seen.contains(url))
            .collect();

        if new_urls.is_empty() {
            if page_num > 1 {
                info!(page = page_num, "No new candidate URLs; stopping pagination");
                break;
            }
            continue;
        }

        debug!(
            page = page_num,
            urls = %truncate_for_log(&new_urls.join(" "), 300),
            "New listing URLs"
        );
        for url in new_urls {
            seen.insert(url.clone());
            discovered.push(url);
        }
    }

    info!(count = discovered.len(), "Listing discovery finished");
    Ok(discovered)
}
