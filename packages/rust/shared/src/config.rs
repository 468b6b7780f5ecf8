//! Application configuration for ArticleSmith.
//!
//! User config lives at `~/.articlesmith/articlesmith.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored here; the config only names the env vars
//! that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArticleSmithError, Result};
use crate::types::DEFAULT_SENTINEL_AUTHOR;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "articlesmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".articlesmith";

// ---------------------------------------------------------------------------
// Config structs (matching articlesmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Article store connection.
    #[serde(default)]
    pub store: StoreConfig,

    /// Competitor search service.
    #[serde(default)]
    pub search: SearchConfig,

    /// Generative model settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Competitor page scraping limits.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Listing ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Evolution settings.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// HTTP trigger service.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which article store implementation to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote store reached over its REST API.
    #[default]
    Http,
    /// Embedded libSQL database on local disk.
    Local,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the store API (without the `/articles` suffix).
    #[serde(default = "default_store_url")]
    pub base_url: String,

    /// Database path for the local backend.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            base_url: default_store_url(),
            db_path: default_db_path(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_db_path() -> String {
    "~/.articlesmith/articles.db".into()
}
fn default_store_timeout() -> u64 {
    15
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Env var holding the search engine id.
    #[serde(default = "default_search_cx_env")]
    pub cx_env: String,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Competitors requested per evolution.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            cx_env: default_search_cx_env(),
            endpoint: default_search_endpoint(),
            result_count: default_result_count(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_search_cx_env() -> String {
    "GOOGLE_CX".into()
}
fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_result_count() -> u32 {
    2
}
fn default_search_timeout() -> u64 {
    10
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Env var holding the model API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,

    /// Persona sent as the model's system instruction.
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
            timeout_secs: default_gemini_timeout(),
            system_instruction: default_system_instruction(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_gemini_timeout() -> u64 {
    60
}
fn default_system_instruction() -> String {
    "You are an expert SEO content strategist. You take an original blog post and evolve it \
     using the reference material provided, keeping the original intent and never inventing \
     facts that are not present in the provided context."
        .into()
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// Maximum characters kept per competitor excerpt.
    #[serde(default = "default_excerpt_max")]
    pub excerpt_max_chars: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout(),
            excerpt_max_chars: default_excerpt_max(),
        }
    }
}

fn default_scrape_timeout() -> u64 {
    5
}
fn default_excerpt_max() -> usize {
    2000
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Listing page scanned for candidate articles.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Maximum candidates considered per run.
    #[serde(default = "default_ingest_limit")]
    pub limit: usize,

    /// Maximum characters stored per ingested excerpt.
    #[serde(default = "default_ingest_excerpt_max")]
    pub excerpt_max_chars: usize,

    #[serde(default = "default_ingest_timeout")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            limit: default_ingest_limit(),
            excerpt_max_chars: default_ingest_excerpt_max(),
            timeout_secs: default_ingest_timeout(),
        }
    }
}

fn default_listing_url() -> String {
    "https://beyondchats.com/blogs/page/14/".into()
}
fn default_ingest_limit() -> usize {
    5
}
fn default_ingest_excerpt_max() -> usize {
    500
}
fn default_ingest_timeout() -> u64 {
    30
}

/// `[evolution]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Author value that marks an article as evolved.
    #[serde(default = "default_sentinel")]
    pub sentinel_author: String,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            sentinel_author: default_sentinel(),
        }
    }
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL_AUTHOR.into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the trigger service listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Browser origin (the dashboard) allowed to call the service cross-origin.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_allowed_origin() -> String {
    "http://localhost:5173".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.articlesmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ArticleSmithError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.articlesmith/articlesmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ArticleSmithError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ArticleSmithError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ArticleSmithError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ArticleSmithError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ArticleSmithError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty secret from the named env var.
pub fn read_secret(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

/// Check that the generative model API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.gemini.api_key_env;
    match read_secret(var_name) {
        Some(_) => Ok(()),
        None => Err(ArticleSmithError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/app/apikey"
        ))),
    }
}

/// Expand a leading `~/` against the user's home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl StoreConfig {
    /// Resolved on-disk path for the local backend.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }
}
