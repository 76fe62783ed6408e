//! Output generation: the RSS feed and the JSON state file.
//!
//! # Submodules
//!
//! - [`rss`]: Renders the feed as RSS 2.0 with Atom and Media RSS extensions
//! - [`state`]: Loads and saves the incremental run state (seen URLs and
//!   cached records)
//!
//! # Output Structure
//!
//! ```text
//! docs/
//! └── darkhorse-top-story.xml        # RSS feed (--output)
//! darkhorse-top-story.seen.json      # state file (--state)
//! ```
//!
//! Both files are written only after the full item list for the run has
//! been computed, feed first.

pub mod rss;
pub mod state;
