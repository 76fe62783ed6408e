//! Persisted run state.
//!
//! The state file remembers which post URLs have been discovered before and
//! caches the records currently in the feed, so a rerun only fetches posts
//! it has never seen:
//!
//! ```json
//! {
//!   "items": { "<canonical url>": { "title": "...", ... } },
//!   "last_run_utc": "2026-02-18T00:00:00+00:00",
//!   "seen_urls": ["<newest>", "..."]
//! }
//! ```
//!
//! Loading is forgiving: a corrupt or hand-mangled file degrades to an
//! empty state with a warning instead of failing the run.

use crate::models::PostItem;
use crate::utils::ensure_parent_dir;
use itertools::Itertools;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Lower bound on how many seen URLs are kept, whatever `--recent` says.
pub const MIN_SEEN_URLS: usize = 2000;

/// In-memory form of the state file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDocument {
    /// Newest-discovered first, deduplicated.
    pub seen_urls: Vec<String>,
    /// Cached records keyed by the link they were stored under.
    pub items: BTreeMap<String, PostItem>,
    pub last_run_utc: Option<String>,
}

impl StateDocument {
    /// Validate a parsed JSON document field by field.
    ///
    /// Wrong-typed fields fall back to their empty value; non-string seen
    /// URLs and non-object items are dropped.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            warn!("State file is not a JSON object. Starting with empty state.");
            return Self::default();
        };

        let seen_urls = match obj.get("seen_urls") {
            Some(Value::Array(urls)) => urls
                .iter()
                .filter_map(|u| u.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect(),
            Some(_) => {
                warn!("State field seen_urls is not a list; ignoring it");
                Vec::new()
            }
            None => Vec::new(),
        };

        let items = match obj.get("items") {
            Some(Value::Object(entries)) => entries
                .iter()
                .filter_map(|(link, data)| match PostItem::from_state(data) {
                    Some(item) => Some((link.clone(), item)),
                    None => {
                        warn!(%link, "Ignoring malformed cached item");
                        None
                    }
                })
                .collect(),
            Some(_) => {
                warn!("State field items is not an object; ignoring it");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        let last_run_utc = obj
            .get("last_run_utc")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            seen_urls,
            items,
            last_run_utc,
        }
    }

    /// JSON form; object keys come out sorted.
    pub fn to_json(&self) -> Value {
        let items: Map<String, Value> = self
            .items
            .iter()
            .map(|(link, item)| (link.clone(), item.as_state()))
            .collect();

        // keys in sorted order
        let mut doc = Map::new();
        doc.insert("items".into(), Value::Object(items));
        doc.insert(
            "last_run_utc".into(),
            self.last_run_utc.clone().map(Value::from).unwrap_or(Value::Null),
        );
        doc.insert("seen_urls".into(), Value::from(self.seen_urls.clone()));
        Value::Object(doc)
    }
}

/// Load state from `path`.
///
/// A missing file or invalid JSON yields an empty state. Other I/O errors
/// (permissions, a directory in the way) are returned.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_state(path: &Path) -> Result<StateDocument, Box<dyn Error>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No state file yet; starting fresh");
            return Ok(StateDocument::default());
        }
        Err(e) => return Err(e.into()),
    };

    let state = match serde_json::from_str::<Value>(&raw) {
        Ok(value) => StateDocument::from_json(&value),
        Err(e) => {
            warn!(error = %e, "State file is invalid JSON. Starting with empty state.");
            StateDocument::default()
        }
    };
    info!(
        seen = state.seen_urls.len(),
        items = state.items.len(),
        last_run = ?state.last_run_utc,
        "Loaded state"
    );
    Ok(state)
}

/// Write `state` as pretty-printed JSON with sorted keys.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn save_state(path: &Path, state: &StateDocument) -> Result<(), Box<dyn Error>> {
    ensure_parent_dir(path).await?;
    let json = serde_json::to_string_pretty(&state.to_json())?;
    fs::write(path, json).await?;
    info!(seen = state.seen_urls.len(), items = state.items.len(), "Wrote state");
    Ok(())
}

/// This run's discovered URLs in front of the prior list, deduplicated
/// (first occurrence wins) and capped at `max(2000, recent * 20)`.
pub fn merge_seen_urls(discovered: &[String], prior: &[String], recent: usize) -> Vec<String> {
    let cap = MIN_SEEN_URLS.max(recent.saturating_mul(20));
    discovered
        .iter()
        .chain(prior.iter())
        .unique()
        .take(cap)
        .cloned()
        .collect()
}
