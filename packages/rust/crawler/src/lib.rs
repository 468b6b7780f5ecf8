//! Page fetching and HTML reduction for ArticleSmith.
//!
//! This crate provides:
//! - [`extract`]: competitor page to plain-text excerpt, with an SSRF guard
//! - [`listing`]: blog listing page to candidate posts for ingestion

mod fetch;
pub mod extract;
pub mod listing;

pub use extract::{ContentExtractor, ExtractOptions, extract_paragraphs};
pub use fetch::is_ssrf_target;
pub use listing::{ListingCandidate, ListingOptions, ListingScraper, parse_date, parse_listing};
