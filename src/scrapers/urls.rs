//! URL canonicalization and post-URL classification.
//!
//! Every URL that enters the pipeline (listing anchors, canonical links,
//! state keys) goes through [`normalize_post_url`] so that byte equality of
//! the normalized form is the dedup key.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static REPEATED_SLASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new("/{2,}").expect("valid slash regex"));

/// Path prefixes (after stripping the leading slash) that never hold posts.
const NON_POST_PREFIXES: [&str; 4] = ["tag/", "author/", "wp-", "feed"];

/// Canonicalize `raw` relative to `base`.
///
/// The result is `scheme://host[:port]/path`, with no query or fragment;
/// protocol-relative input inherits the base's (https) scheme.
/// Runs of slashes in the path collapse to one and a single trailing slash
/// is removed (the root path `/` is kept). Input that cannot be resolved
/// is returned trimmed but otherwise untouched.
///
/// Normalization is idempotent.
pub fn normalize_post_url(raw: &str, base: &Url) -> String {
    let raw = raw.trim();
    let Ok(url) = base.join(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };

    let scheme = url.scheme();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();

    let mut path = REPEATED_SLASHES.replace_all(url.path(), "/").into_owned();
    if path.is_empty() {
        path.push('/');
    }
    if path != "/" && path.ends_with('/') {
        path.pop();
    }

    format!("{scheme}://{host}{port}{path}")
}

/// Does `url` look like an individual post on `site_host`?
///
/// Rejects foreign hosts, listing and archive pages, WordPress internals
/// and anything with fewer than two path segments.
pub fn looks_like_post_url(url: &str, site_host: &str) -> bool {
    let (host, raw_path) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().map(str::to_string),
            parsed.path().to_string(),
        ),
        Err(_) => (None, url.split(['?', '#']).next().unwrap_or_default().to_string()),
    };

    if let Some(host) = host {
        if !host_matches(&host, site_host) {
            return false;
        }
    }

    let path = raw_path.trim_matches('/');
    if path.is_empty() {
        return false;
    }
    if format!("/{path}/").contains("/category/") {
        return false;
    }
    if path.starts_with("page/") || path.ends_with("/page") {
        return false;
    }
    if NON_POST_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return false;
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments
        .iter()
        .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
    {
        // /2026/02/18/ style date archive
        return false;
    }
    segments.len() >= 2
}

fn host_matches(host: &str, site_host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let site_host = site_host.to_ascii_lowercase();
    host == site_host || host.ends_with(&format!(".{site_host}"))
}
