//! Single-post scraping and field extraction.
//!
//! Each field has its own extractor, a pure `&Html -> value` function that
//! walks an ordered cascade of selectors and meta tags and stops at the
//! first non-empty hit. The cascades target the WordPress/Elementor markup
//! Darkhorse Press uses, with generic fallbacks after the site-specific
//! ones.

use crate::models::PostItem;
use crate::scrapers::dates::{format_iso, format_rfc2822, parse_datetime_str};
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::html::{
    collapse_whitespace, element_text, first_text, meta_content, selector, visible_text,
};
use crate::scrapers::urls::normalize_post_url;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Containers whose direct `<p>` children are the article body.
const CONTENT_CONTAINER_SELECTORS: [&str; 5] = [
    ".elementor-widget-theme-post-content .elementor-widget-container",
    ".entry-content",
    ".post-content",
    ".td-post-content",
    "article .content",
];

/// Paragraph selectors for the single-paragraph summary fallback.
const SUMMARY_PARAGRAPH_SELECTORS: [&str; 4] = [
    "article .entry-content p",
    ".post-content p",
    ".entry-content p",
    "article p",
];

const FEATURED_IMAGE_SELECTORS: [&str; 5] = [
    "article img.wp-post-image",
    ".post-thumbnail img",
    ".featured-image img",
    ".entry-content figure img",
    "article img",
];

/// Body paragraphs shorter than this are captions, bylines or share-bar
/// debris.
const MIN_CONTENT_PARAGRAPH_CHARS: usize = 20;
/// Minimum length for the single-paragraph summary fallback.
const MIN_SUMMARY_CHARS: usize = 40;
/// Length of the last-resort whole-page excerpt.
const PAGE_TEXT_EXCERPT_CHARS: usize = 280;

pub fn extract_title(document: &Html) -> String {
    meta_content(
        document,
        &[
            ("property", "og:title"),
            ("name", "og:title"),
            ("name", "twitter:title"),
            ("property", "twitter:title"),
        ],
    )
    .or_else(|| first_text(document, &["h1.entry-title", "article h1", "h1", "title"]))
    .unwrap_or_else(|| "Untitled".to_string())
}

/// `<link rel=canonical>`, then `og:url`, then the fetched URL; always
/// normalized against `page_url`.
pub fn extract_canonical_url(document: &Html, page_url: &Url) -> String {
    let canonical = selector(r#"link[rel="canonical"]"#).and_then(|sel| {
        document
            .select(&sel)
            .filter_map(|link| link.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string)
    });

    let raw = canonical
        .or_else(|| meta_content(document, &[("property", "og:url"), ("name", "og:url")]))
        .unwrap_or_else(|| page_url.to_string());
    normalize_post_url(&raw, page_url)
}

/// Publish time, or `None` when nothing on the page parses.
pub fn extract_publish_datetime(document: &Html) -> Option<DateTime<Utc>> {
    if let Some(time_sel) = selector("time") {
        for time in document.select(&time_sel) {
            let from_attr = time
                .value()
                .attr("datetime")
                .and_then(parse_datetime_str);
            if let Some(dt) = from_attr.or_else(|| parse_datetime_str(&element_text(time))) {
                return Some(dt);
            }
        }
    }

    meta_content(
        document,
        &[
            ("property", "article:published_time"),
            ("name", "article:published_time"),
            ("property", "og:published_time"),
            ("name", "og:published_time"),
        ],
    )
    .or_else(|| first_text(document, &[".entry-date", ".posted-on", ".post-date"]))
    .and_then(|raw| parse_datetime_str(&raw))
}

/// Byline, or an empty string.
pub fn extract_author(document: &Html) -> String {
    meta_content(document, &[("name", "author"), ("property", "article:author")])
        .or_else(|| {
            first_text(
                document,
                &[".author-name", ".byline .author", ".entry-author", "[rel='author']"],
            )
        })
        .unwrap_or_default()
}

/// Direct paragraph children of the main content container.
///
/// Containers are tried in order and the first that yields any qualifying
/// paragraph wins. Paragraphs without text (image-only, empty spacers) and
/// paragraphs shorter than [`MIN_CONTENT_PARAGRAPH_CHARS`] are dropped.
pub fn extract_article_paragraphs(document: &Html) -> Vec<String> {
    for css in CONTENT_CONTAINER_SELECTORS {
        let Some(sel) = selector(css) else {
            continue;
        };
        for container in document.select(&sel) {
            let paragraphs: Vec<String> = container
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "p")
                .map(element_text)
                .filter(|text| text.chars().count() >= MIN_CONTENT_PARAGRAPH_CHARS)
                .collect();
            if !paragraphs.is_empty() {
                return paragraphs;
            }
        }
    }
    Vec::new()
}

/// First reasonably long paragraph under the summary selectors, else the
/// start of the page's visible text.
pub fn extract_summary(document: &Html) -> String {
    let paragraph = SUMMARY_PARAGRAPH_SELECTORS.iter().find_map(|css| {
        let sel = selector(css)?;
        document
            .select(&sel)
            .map(element_text)
            .find(|text| text.chars().count() >= MIN_SUMMARY_CHARS)
    });

    paragraph.unwrap_or_else(|| {
        visible_text(document)
            .chars()
            .take(PAGE_TEXT_EXCERPT_CHARS)
            .collect()
    })
}

/// Rebuild paragraphs as escaped `<p>` blocks.
pub fn paragraphs_to_html(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", html_escape::encode_text(p)))
        .collect()
}

/// Featured image, resolved against `page_url`.
pub fn extract_featured_image(document: &Html, page_url: &Url) -> Option<String> {
    let resolve = |raw: &str| {
        page_url
            .join(raw.trim())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.trim().to_string())
    };

    if let Some(meta) = meta_content(
        document,
        &[
            ("property", "og:image"),
            ("name", "og:image"),
            ("property", "twitter:image"),
            ("name", "twitter:image"),
        ],
    ) {
        return Some(resolve(&meta));
    }

    FEATURED_IMAGE_SELECTORS.iter().find_map(|css| {
        let sel = selector(css)?;
        let img = document.select(&sel).next()?;
        image_source(img).map(|src| resolve(&src))
    })
}

/// `src`, `data-src`, `data-lazy-src`, then the first `srcset` candidate.
fn image_source(img: ElementRef<'_>) -> Option<String> {
    let attrs = img.value();
    ["src", "data-src", "data-lazy-src"]
        .iter()
        .filter_map(|name| attrs.attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .or_else(|| {
            attrs
                .attr("srcset")
                .and_then(|srcset| srcset.split_whitespace().next())
                .map(|first| first.trim_end_matches(','))
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

/// Run every extractor over an already-fetched post page.
///
/// `now` is the fallback publish time when the page carries no parseable
/// date.
pub fn parse_post(html: &str, page_url: &Url, now: DateTime<Utc>) -> PostItem {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let link = extract_canonical_url(&document, page_url);
    let pub_dt = extract_publish_datetime(&document).unwrap_or_else(|| {
        debug!(url = %page_url, "No parseable publish date; using scrape time");
        now
    });
    let author = extract_author(&document);

    let paragraphs = extract_article_paragraphs(&document);
    let (summary, content_html) = match paragraphs.first() {
        Some(first) => (first.clone(), Some(paragraphs_to_html(&paragraphs))),
        None => (extract_summary(&document), None),
    };

    let image_base = Url::parse(&link).unwrap_or_else(|_| page_url.clone());
    let image_url = extract_featured_image(&document, &image_base);

    PostItem {
        title,
        guid: link.clone(),
        link,
        pub_date: format_rfc2822(&pub_dt),
        pub_dt_iso: format_iso(&pub_dt),
        author,
        summary: collapse_whitespace(&summary),
        content_html,
        image_url,
    }
}

/// Fetch and parse one post. Returns `None` when the page cannot be
/// fetched; the caller simply leaves the URL out of this run.
#[instrument(level = "info", skip(fetcher))]
pub async fn scrape_post(fetcher: &PageFetcher, url: &str) -> Option<PostItem> {
    let page_url = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            warn!(%url, error = %e, "Not an absolute URL; skipping");
            return None;
        }
    };
    let html = fetcher.fetch_html_or_warn(url).await?;
    let item = parse_post(&html, &page_url, Utc::now());
    info!(link = %item.link, title = %item.title, "Scraped post");
    Some(item)
}
