//! Site and feed configuration.
//!
//! Everything that used to be a hard-coded constant (site URLs, feed
//! metadata, user agent, request pacing) lives in [`SiteConfig`]. The
//! defaults describe the Darkhorse Press "Top Story" category; a YAML file
//! passed with `--config` can override any subset of fields.
//!
//! ```yaml
//! category_url: "https://darkhorsepressnow.com/category/news/top-story/"
//! request_delay_ms: 2000
//! ```

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Configuration for the scraped site and the published feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Listing page that is paginated for post discovery.
    pub category_url: String,
    /// Site root used to resolve relative links and to decide which hosts
    /// count as "our" site.
    pub base_url: String,
    /// Channel `<title>`.
    pub feed_title: String,
    /// Channel `<description>`.
    pub feed_description: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Pause between consecutive HTTP requests.
    pub request_delay_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            category_url: "https://darkhorsepressnow.com/category/news/top-story/".to_string(),
            base_url: "https://darkhorsepressnow.com".to_string(),
            feed_title: "Darkhorse Press - Top Story".to_string(),
            feed_description: "Latest Top Story posts from Darkhorse Press.".to_string(),
            user_agent: concat!(
                "Mozilla/5.0 (compatible; DarkhorseTopStoryRSSBot/",
                env!("CARGO_PKG_VERSION"),
                ")"
            )
            .to_string(),
            request_timeout_secs: 20,
            request_delay_ms: 1000,
        }
    }
}

impl SiteConfig {
    /// Load a YAML override file. Fields missing from the file keep their
    /// defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config: SiteConfig = serde_yaml::from_str(&raw)?;
        info!(category_url = %config.category_url, "Loaded site configuration");
        Ok(config)
    }

    /// Parsed [`SiteConfig::base_url`].
    pub fn base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Parsed [`SiteConfig::category_url`].
    pub fn category(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.category_url)
    }

    /// Host of the site, e.g. `darkhorsepressnow.com`. Empty when the base
    /// URL has no host.
    pub fn site_host(&self) -> String {
        self.base()
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fail fast on URLs that cannot be parsed.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        self.base()
            .map_err(|e| format!("invalid base_url {:?}: {e}", self.base_url))?;
        self.category()
            .map_err(|e| format!("invalid category_url {:?}: {e}", self.category_url))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_point_at_top_story() {
        let config = SiteConfig::default();
        assert_eq!(config.site_host(), "darkhorsepressnow.com");
        assert!(config.category_url.ends_with("/top-story/"));
        assert_eq!(config.request_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_subset_of_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "feed_title: \"Custom\"\nrequest_delay_ms: 0").unwrap();

        let config = SiteConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.feed_title, "Custom");
        assert_eq!(config.request_delay_ms, 0);
        assert_eq!(config.base_url, SiteConfig::default().base_url);
    }

    #[test]
    fn test_validate_rejects_relative_category() {
        let config = SiteConfig {
            category_url: "/category/news/".to_string(),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_site_host_follows_base_url() {
        let config = SiteConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(config.site_host(), "127.0.0.1");
    }
}
