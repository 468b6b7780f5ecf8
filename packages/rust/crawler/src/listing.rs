//! Blog listing page scanner used by ingestion.
//!
//! A listing page is scanned for post containers. The first container
//! selector that matches anything decides the container set; within each
//! container every field is looked up through its own selector cascade and
//! the first non-empty value wins.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use articlesmith_shared::{ArticleSmithError, Result, truncate_chars};

use crate::fetch::{BROWSER_USER_AGENT, build_client, fetch_html};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXCERPT_MAX_CHARS: usize = 500;

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
}

static CONTAINER_SELS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["article", ".elementor-post", ".post", ".blog-post"]));

static TITLE_SELS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["h2", "h3", ".entry-title", ".elementor-post__title"]));

static EXCERPT_SELS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".entry-content p", ".elementor-post__excerpt p", "p"]));

static AUTHOR_SELS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".author", ".elementor-post-author"]));

static DATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").expect("valid selector"));

/// A post found on a listing page, before defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCandidate {
    pub title: String,
    pub excerpt: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Options for [`ListingScraper`].
#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub timeout_secs: u64,
    pub excerpt_max_chars: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            excerpt_max_chars: DEFAULT_EXCERPT_MAX_CHARS,
        }
    }
}

/// Fetches a listing page and extracts candidate posts.
#[derive(Clone)]
pub struct ListingScraper {
    client: Client,
    excerpt_max_chars: usize,
}

impl ListingScraper {
    pub fn new(opts: &ListingOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(BROWSER_USER_AGENT, opts.timeout_secs, true, false)?,
            excerpt_max_chars: opts.excerpt_max_chars,
        })
    }

    /// Fetch `listing_url` and return up to `limit` complete candidates.
    #[instrument(skip(self), fields(listing_url = %listing_url))]
    pub async fn scan(&self, listing_url: &str, limit: usize) -> Result<Vec<ListingCandidate>> {
        let url = Url::parse(listing_url).map_err(|e| {
            ArticleSmithError::validation(format!("invalid listing URL '{listing_url}': {e}"))
        })?;

        let html = fetch_html(&self.client, &url).await?;
        let candidates = parse_listing(&html, limit, self.excerpt_max_chars);

        info!(candidates = candidates.len(), limit, "listing scanned");
        Ok(candidates)
    }
}

/// Extract candidates from listing HTML. At most `limit` containers are
/// considered; those without a title or an excerpt are discarded.
pub fn parse_listing(html: &str, limit: usize, excerpt_max_chars: usize) -> Vec<ListingCandidate> {
    let doc = Html::parse_document(html);

    let Some(container_sel) = CONTAINER_SELS
        .iter()
        .find(|sel| doc.select(sel).next().is_some())
    else {
        debug!("no post containers on page");
        return Vec::new();
    };

    doc.select(container_sel)
        .take(limit)
        .filter_map(|container| {
            let title = first_text(&container, &TITLE_SELS);
            let excerpt = first_text(&container, &EXCERPT_SELS);
            match (title, excerpt) {
                (Some(title), Some(excerpt)) => Some(ListingCandidate {
                    title,
                    excerpt: truncate_chars(&excerpt, excerpt_max_chars),
                    author: first_text(&container, &AUTHOR_SELS),
                    published_at: container
                        .select(&DATE_SEL)
                        .next()
                        .and_then(|t| t.value().attr("datetime"))
                        .and_then(parse_date),
                }),
                _ => {
                    debug!("discarding container without title or excerpt");
                    None
                }
            }
        })
        .collect()
}

/// First non-empty, whitespace-normalized text across a selector cascade.
fn first_text(scope: &ElementRef<'_>, cascade: &[Selector]) -> Option<String> {
    cascade.iter().find_map(|sel| {
        scope
            .select(sel)
            .next()
            .map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
    })
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
