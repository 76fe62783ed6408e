//! Scraping of the Darkhorse Press category listing and its posts.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Discovery**: page through the category listing and collect
//!    candidate post URLs ([`listing`])
//! 2. **Scraping**: fetch each new post and extract its fields ([`post`])
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | Shared HTTP client, timeout and error type |
//! | [`urls`] | URL canonicalization and post-URL heuristics |
//! | [`listing`] | Paginated listing discovery |
//! | [`post`] | Per-field extractors and the post scraper |
//! | [`dates`] | Tolerant date parsing, always to UTC |
//! | [`html`] | Selector-cascade helpers |
//!
//! All requests are sequential. A failed page or post is logged and
//! skipped; nothing in this module aborts a run.

pub mod dates;
pub mod fetch;
pub mod html;
pub mod listing;
pub mod post;
pub mod urls;
