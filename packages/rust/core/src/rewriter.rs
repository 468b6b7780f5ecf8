//! Prompt construction and generative rewriting.
//!
//! [`GenerativeRewriter`] turns an article plus its research context into a
//! single prompt, sends it to a [`TextGenerator`] once, and sanitizes the
//! reply into plain text.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use articlesmith_markdown::strip_markdown;
use articlesmith_shared::{Article, ArticleSmithError, GeminiConfig, ResearchContext, Result};

const USER_AGENT: &str = concat!("ArticleSmith/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

/// A generative text model.
///
/// Implementations report rate limiting as `QuotaExceeded`; every other
/// failure may use any error variant and is normalized by the rewriter.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent<'a>>,
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiGenerator {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    system_instruction: Option<String>,
}

impl GeminiGenerator {
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArticleSmithError::Network(format!("failed to build HTTP client: {e}")))?;

        let system_instruction = Some(config.system_instruction.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            api_key: api_key.into(),
            model: config.model.clone(),
            system_instruction,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            system_instruction: self.system_instruction.as_deref().map(|text| RequestContent {
                role: None,
                parts: vec![RequestPart { text }],
            }),
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArticleSmithError::GenerationFailure(format!("model request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ArticleSmithError::GenerationFailure(format!("model body read failed: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            ArticleSmithError::GenerationFailure(format!("malformed model response: {e}"))
        })?;

        let output: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(chars = output.len(), "model responded");
        Ok(output)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn classify_failure(status: StatusCode, body: &str) -> ArticleSmithError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let exhausted = detail
        .as_ref()
        .is_some_and(|d| d.status == "RESOURCE_EXHAUSTED");
    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        return ArticleSmithError::quota_exceeded();
    }

    let message = detail.map(|d| d.message).unwrap_or_default();
    ArticleSmithError::GenerationFailure(format!("model returned HTTP {status}: {message}"))
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const PROMPT_PREAMBLE: &str = "\
ROLE: Expert Content Strategist.
TASK: Rewrite the original article below with more depth, a professional tone and better flow, \
drawing on the competitor context provided.

FORMATTING RULES:
1. Do not use any Markdown symbols (no #, no **, no *, no links).
2. Use plain text only.
3. Separate paragraphs with simple line breaks.
4. Write each section header in ALL CAPS on its own line.
5. Do not add a reference or source section. Citations are attached separately.
";

/// Build the rewrite prompt. The output depends only on the arguments.
pub fn build_prompt(article: &Article, research: &ResearchContext) -> String {
    let mut prompt = String::from(PROMPT_PREAMBLE);

    // Writing into a String cannot fail.
    let _ = write!(
        prompt,
        "\nORIGINAL ARTICLE:\nTitle: {}\nContent: {}\n\nCOMPETITOR CONTEXT:\n",
        article.title, article.content
    );

    if research.is_empty() {
        prompt.push_str("(no competitor sources were available)\n");
    }
    for excerpt in &research.excerpts {
        let _ = write!(
            prompt,
            "SOURCE: {}\nCONTENT: {}\n\n",
            excerpt.source_title, excerpt.excerpt
        );
    }

    prompt
}

/// SHA-256 hex digest of a prompt, for correlating runs in logs.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// GenerativeRewriter
// ---------------------------------------------------------------------------

/// Produces replacement article text from a model.
#[derive(Clone)]
pub struct GenerativeRewriter {
    generator: Arc<dyn TextGenerator>,
}

impl GenerativeRewriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Generate sanitized replacement text for `article`.
    #[instrument(skip_all, fields(model = self.generator.model(), sources = research.len()))]
    pub async fn rewrite(&self, article: &Article, research: &ResearchContext) -> Result<String> {
        let prompt = build_prompt(article, research);
        info!(
            prompt_sha256 = %prompt_fingerprint(&prompt),
            prompt_chars = prompt.chars().count(),
            "sending rewrite prompt"
        );

        let raw = self.generator.generate(&prompt).await.map_err(|e| match e {
            e @ (ArticleSmithError::QuotaExceeded { .. }
            | ArticleSmithError::GenerationFailure(_)) => e,
            other => ArticleSmithError::GenerationFailure(other.to_string()),
        })?;

        let clean = strip_markdown(&raw);
        if clean.is_empty() {
            warn!("model output was empty after sanitation");
            return Err(ArticleSmithError::GenerationFailure(
                "model returned no usable text".into(),
            ));
        }
        Ok(clean)
    }
}
