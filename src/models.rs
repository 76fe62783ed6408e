//! Data models for scraped posts.
//!
//! [`PostItem`] is the single record type that flows through the pipeline:
//! the post scraper creates it from live HTML, the state store persists it,
//! and the RSS writer renders it. Records are never mutated in place; a
//! re-scrape replaces the cached record wholesale.

use serde_json::{Map, Value};

/// A single post as published in the feed.
///
/// `link` is always a canonical URL (see
/// [`normalize_post_url`](crate::scrapers::urls::normalize_post_url)) and
/// doubles as the record's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostItem {
    /// Headline. Falls back to `"Untitled"` when the page has none.
    pub title: String,
    /// Canonical post URL.
    pub link: String,
    /// Permalink GUID; equal to `link`.
    pub guid: String,
    /// Publish time formatted per RFC 2822 for `<pubDate>`.
    pub pub_date: String,
    /// Publish time in RFC 3339, used as the sort key.
    pub pub_dt_iso: String,
    /// Byline; may be empty.
    pub author: String,
    /// Plain-text excerpt.
    pub summary: String,
    /// Full body reconstructed as `<p>` blocks, when a content container
    /// was found.
    pub content_html: Option<String>,
    /// Featured image, absolute.
    pub image_url: Option<String>,
}

impl PostItem {
    /// Serialize for the state file.
    pub fn as_state(&self) -> Value {
        // keys in sorted order
        let mut map = Map::new();
        map.insert("author".into(), Value::from(self.author.as_str()));
        if let Some(content) = &self.content_html {
            map.insert("content_html".into(), Value::from(content.as_str()));
        }
        map.insert("guid".into(), Value::from(self.guid.as_str()));
        if let Some(image) = &self.image_url {
            map.insert("image_url".into(), Value::from(image.as_str()));
        }
        map.insert("link".into(), Value::from(self.link.as_str()));
        map.insert("pub_date".into(), Value::from(self.pub_date.as_str()));
        map.insert("pub_dt_iso".into(), Value::from(self.pub_dt_iso.as_str()));
        map.insert("summary".into(), Value::from(self.summary.as_str()));
        map.insert("title".into(), Value::from(self.title.as_str()));
        Value::Object(map)
    }

    /// Rebuild a record from a state-file entry.
    ///
    /// State files are hand-editable and may come from older versions, so
    /// every field is validated individually: anything missing or not a
    /// string becomes empty, `guid` falls back to `link`, and empty
    /// optional fields become `None`. Returns `None` when the entry is not
    /// a JSON object at all.
    pub fn from_state(data: &Value) -> Option<Self> {
        let obj = data.as_object()?;
        let field = |key: &str| -> String {
            obj.get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let optional = |key: &str| -> Option<String> { Some(field(key)).filter(|s| !s.is_empty()) };

        let link = field("link");
        let guid = Some(field("guid"))
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| link.clone());

        Some(Self {
            title: field("title"),
            guid,
            link,
            pub_date: field("pub_date"),
            pub_dt_iso: field("pub_dt_iso"),
            author: field("author"),
            summary: field("summary"),
            content_html: optional("content_html"),
            image_url: optional("image_url"),
        })
    }
}
