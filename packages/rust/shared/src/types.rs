//! Core domain types for ArticleSmith articles and research context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ArticleSmithError, Result};

/// Author value that marks an article as already evolved.
pub const DEFAULT_SENTINEL_AUTHOR: &str = "Gemini AI";

/// Author assigned to ingested articles whose byline could not be scraped.
pub const DEFAULT_AUTHOR: &str = "Admin";

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Opaque, store-assigned article identifier.
///
/// The reference store hands out integer ids, so deserialization accepts
/// either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Validate a raw id. It ends up in a URL path, so only ASCII
    /// alphanumerics, `-` and `_` are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArticleSmithError::invalid_request("Article ID is required."));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ArticleSmithError::invalid_request(format!(
                "malformed article id: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = ArticleSmithError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for ArticleId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ArticleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self::from(n)),
            RawId::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A citation attached to an evolved article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

impl Reference {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// An article as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Store-assigned identifier.
    pub id: ArticleId,
    /// Headline.
    pub title: String,
    /// Plain text body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Byline; doubles as the evolution marker.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    /// Citations, only present after evolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    /// Original publication time; never changed by evolution.
    #[serde(alias = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl Article {
    /// Whether the article already carries the sentinel author.
    pub fn is_evolved(&self, sentinel: &str) -> bool {
        self.author == sentinel
    }
}

/// Payload for creating an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
}

/// Payload for overwriting an existing article in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub title: String,
    pub content: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ResearchContext
// ---------------------------------------------------------------------------

/// One competitor source that was successfully reduced to an excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchExcerpt {
    pub source_title: String,
    pub source_url: String,
    pub excerpt: String,
}

/// Excerpts gathered for a single evolution run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchContext {
    pub excerpts: Vec<ResearchExcerpt>,
}

impl ResearchContext {
    pub fn push(&mut self, source: &Reference, excerpt: String) {
        self.excerpts.push(ResearchExcerpt {
            source_title: source.title.clone(),
            source_url: source.url.clone(),
            excerpt,
        });
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    /// The `(title, url)` list that becomes the article's references.
    pub fn references(&self) -> Vec<Reference> {
        self.excerpts
            .iter()
            .map(|e| Reference::new(&e.source_title, &e.source_url))
            .collect()
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_accepts_numbers_and_strings() {
        let from_num: ArticleId = serde_json::from_str("36").expect("numeric id");
        let from_str: ArticleId = serde_json::from_str("\"36\"").expect("string id");
        assert_eq!(from_num, from_str);
        assert_eq!(from_num.as_str(), "36");
    }

    #[test]
    fn article_id_rejects_empty_and_path_characters() {
        assert!(ArticleId::parse("").is_err());
        assert!(ArticleId::parse("   ").is_err());
        assert!(ArticleId::parse("../admin").is_err());
        assert!(ArticleId::parse("12/34").is_err());
        assert!(ArticleId::parse(" 0192a-bc_d ").is_ok());
    }

    #[test]
    fn article_deserializes_store_payload() {
        let json = r#"{
            "id": 36,
            "title": "X",
            "content": "Y",
            "author": null,
            "references": null,
            "published_at": "2024-03-01T10:00:00.000000Z",
            "created_at": "2024-03-01T10:00:00.000000Z"
        }"#;
        let article: Article = serde_json::from_str(json).expect("deserialize");
        assert_eq!(article.id.as_str(), "36");
        assert_eq!(article.author, "");
        assert!(article.references.is_none());
        assert!(!article.is_evolved(DEFAULT_SENTINEL_AUTHOR));
    }

    #[test]
    fn article_accepts_camel_case_date() {
        let json = r#"{"id":"a1","title":"T","content":"C","author":"Gemini AI",
            "publishedAt":"2024-03-01T10:00:00Z"}"#;
        let article: Article = serde_json::from_str(json).expect("deserialize");
        assert!(article.is_evolved(DEFAULT_SENTINEL_AUTHOR));
    }

    #[test]
    fn update_omits_absent_references() {
        let update = ArticleUpdate {
            title: "T".into(),
            content: "C".into(),
            author: "A".into(),
            published_at: Utc::now(),
            references: None,
        };
        let json = serde_json::to_string(&update).expect("serialize");
        assert!(!json.contains("references"));
    }

    #[test]
    fn research_context_references_follow_excerpt_order() {
        let mut ctx = ResearchContext::default();
        ctx.push(&Reference::new("B", "https://b.example"), "bbb".into());
        ctx.push(&Reference::new("A", "https://a.example"), "aaa".into());
        let refs = ctx.references();
        assert_eq!(refs[0].title, "B");
        assert_eq!(refs[1].url, "https://a.example");
    }

    #[test]
    fn truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
