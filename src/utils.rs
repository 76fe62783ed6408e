//! Utility functions for logging, file system preparation, and feed
//! self-link inference.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for log fields
//! - Parent-directory creation before output writes
//! - Deriving the published feed URL from the repository's git remote

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Matches `url = https://github.com/<owner>/<repo>[.git]` in `.git/config`.
static GITHUB_REMOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)url\s*=\s*https://github\.com/([^/\s]+)/([^/\s]+?)(?:\.git)?\s*$")
        .expect("valid remote regex")
});

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to a
/// character boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Create the parent directory of `path` if it has one.
pub async fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Best-effort public URL of the feed, for the channel's `atom:link`.
///
/// When `git_config` names a GitHub remote the feed is assumed to be served
/// from that repository's GitHub Pages site; otherwise a placeholder
/// template is returned.
#[instrument(level = "debug", skip_all)]
pub fn infer_repo_feed_url(output_path: &Path, git_config: &Path) -> String {
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let owner_repo = std::fs::read(git_config).ok().and_then(|bytes| {
        let content = String::from_utf8_lossy(&bytes);
        GITHUB_REMOTE
            .captures(&content)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    });

    match owner_repo {
        Some((owner, repo)) => {
            debug!(%owner, %repo, "Inferred feed URL from git remote");
            format!("https://{owner}.github.io/{repo}/{file_name}")
        }
        None => format!("https://<username>.github.io/<repo>/{file_name}"),
    }
}
