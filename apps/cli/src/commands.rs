//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use articlesmith_core::{IngestOutcome, ProgressReporter, Services};
use articlesmith_shared::{
    AppConfig, ArticleSmithError, init_config, load_config, validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ArticleSmith: research-backed article rewriting.
#[derive(Parser)]
#[command(
    name = "articlesmith",
    version,
    about = "Seed an article store from a blog listing and rewrite articles against competitor research.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape a blog listing page and save its posts to the store.
    Ingest {
        /// Listing page URL (defaults to `[ingest] listing_url`).
        #[arg(long)]
        url: Option<String>,

        /// Maximum posts to save (defaults to `[ingest] limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rewrite one article using competitor research.
    Evolve {
        /// Store id of the article.
        id: String,
    },

    /// List articles in the store.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "articlesmith=info",
        1 => "articlesmith=debug",
        _ => "articlesmith=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest { url, limit } => cmd_ingest(url, limit).await,
        Command::Evolve { id } => cmd_evolve(&id).await,
        Command::List => cmd_list().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(url: Option<String>, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let listing_url = url.unwrap_or_else(|| config.ingest.listing_url.clone());
    let limit = limit.unwrap_or(config.ingest.limit);
    if limit == 0 {
        return Err(eyre!("--limit must be at least 1"));
    }

    info!(url = %listing_url, limit, "ingesting listing");

    let services = Services::from_config(config).await?;
    let reporter = CliProgress::new();
    let outcome = match services
        .ingestion
        .ingest(&listing_url, limit, &reporter)
        .await
    {
        Ok(outcome) => outcome,
        Err(ArticleSmithError::EmptyListing { url }) => {
            reporter.clear();
            return Err(eyre!("scraper found no data at {url}"));
        }
        Err(e) => {
            reporter.clear();
            return Err(e.into());
        }
    };

    println!();
    println!("  Ingestion complete!");
    println!("  Saved:  {}", outcome.articles.len());
    println!("  Failed: {}", outcome.failed);
    println!("  Store:  {}", services.store.name());
    println!("  Time:   {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
    for article in &outcome.articles {
        println!("  [{}] {}", article.id, article.title);
    }
    println!();

    Ok(())
}

async fn cmd_evolve(id: &str) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let services = Services::from_config(config).await?;
    let spinner = spinner(format!("Evolving article {id}"));
    let result = services.evolution.evolve(id).await;
    spinner.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ArticleSmithError::QuotaExceeded { retry_hint }) => return Err(eyre!(retry_hint)),
        Err(e) => return Err(e.into()),
    };

    println!();
    if outcome.already_evolved {
        println!("  This article is already optimized.");
    } else {
        println!("  Evolution complete. Article updated successfully.");
    }
    let article = &outcome.article;
    println!("  ID:         {}", article.id);
    println!("  Title:      {}", article.title);
    println!("  Author:     {}", article.author);
    println!("  Published:  {}", article.published_at.format("%Y-%m-%d"));
    if let Some(refs) = article.references.as_deref().filter(|r| !r.is_empty()) {
        println!("  References:");
        for r in refs {
            println!("    - {} ({})", r.title, r.url);
        }
    }
    println!();

    Ok(())
}

async fn cmd_list() -> Result<()> {
    let config = load_config()?;
    let services = Services::from_config(config).await?;
    let articles = services.store.list().await?;
    let sentinel = &services.config.evolution.sentinel_author;

    info!(count = articles.len(), store = services.store.name(), "listing articles");

    if articles.is_empty() {
        println!("No articles yet. Run `articlesmith ingest` first.");
        return Ok(());
    }

    for article in &articles {
        let marker = if article.is_evolved(sentinel) { "*" } else { " " };
        println!(
            "{marker} {:>5}  {}  {:<16}  {}",
            article.id,
            article.published_at.format("%Y-%m-%d"),
            article.author,
            article.title
        );
    }
    println!();
    println!("  * evolved by {sentinel}");

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message);
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: spinner(String::new()),
        }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_saved(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Saved [{current}/{total}] {title}"));
    }

    fn article_failed(&self, title: &str, error: &ArticleSmithError) {
        self.spinner.println(format!("  skipped \"{title}\": {error}"));
    }

    fn done(&self, _outcome: &IngestOutcome) {
        self.spinner.finish_and_clear();
    }
}
