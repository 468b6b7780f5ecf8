//! Reduce a competitor page to a bounded plain-text excerpt.
//!
//! Extraction is best effort. A source that cannot be fetched, answers with
//! a non-2xx status, or yields no paragraph text is skipped by returning
//! `None`; the caller carries on with whatever sources did work.

use std::sync::LazyLock;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use articlesmith_shared::{ArticleSmithError, Result, truncate_chars};

use crate::fetch::{USER_AGENT, build_client, fetch_html, is_ssrf_target};

/// Default timeout for a single source fetch.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default excerpt length in characters.
const DEFAULT_MAX_CHARS: usize = 2000;

/// Elements whose text never counts as article content.
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript",
];

static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Options for [`ContentExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub timeout_secs: u64,
    pub max_chars: usize,
    /// Permit loopback and private targets, including redirect hops. Only for
    /// tests and local development against mock servers.
    pub allow_private: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_chars: DEFAULT_MAX_CHARS,
            allow_private: false,
        }
    }
}

/// Fetches a page and returns its paragraph text.
#[derive(Clone)]
pub struct ContentExtractor {
    client: Client,
    max_chars: usize,
    allow_private: bool,
}

impl ContentExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(USER_AGENT, opts.timeout_secs, false, !opts.allow_private)?,
            max_chars: opts.max_chars,
            allow_private: opts.allow_private,
        })
    }

    /// Fetch `url` and return its excerpt, or `None` if anything goes wrong.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Option<String> {
        match self.try_extract(url).await {
            Ok(excerpt) => {
                debug!(chars = excerpt.chars().count(), "extracted excerpt");
                Some(excerpt)
            }
            Err(e) => {
                warn!(error = %e, "skipping source");
                None
            }
        }
    }

    async fn try_extract(&self, raw_url: &str) -> Result<String> {
        let url = Url::parse(raw_url)
            .map_err(|e| ArticleSmithError::scrape(raw_url, format!("invalid URL: {e}")))?;

        if !self.allow_private && is_ssrf_target(&url) {
            return Err(ArticleSmithError::scrape(raw_url, "SSRF protection: blocked"));
        }

        let html = fetch_html(&self.client, &url)
            .await
            .map_err(|e| ArticleSmithError::scrape(raw_url, e.to_string()))?;

        let excerpt = extract_paragraphs(&html, self.max_chars);
        if excerpt.is_empty() {
            return Err(ArticleSmithError::scrape(raw_url, "no paragraph text"));
        }
        Ok(excerpt)
    }
}

/// Join the text of every content `<p>` with single spaces, truncated to
/// `max_chars` characters.
pub fn extract_paragraphs(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let text = doc
        .select(&PARAGRAPH_SEL)
        .filter(|p| !inside_non_content(p))
        .map(|p| p.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    truncate_chars(&text, max_chars)
}

fn inside_non_content(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NON_CONTENT_TAGS.contains(&a.value().name()))
}
