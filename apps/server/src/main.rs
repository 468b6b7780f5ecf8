//! ArticleSmith trigger service.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};

use articlesmith_core::Services;
use articlesmith_server::{AppState, build_router};
use articlesmith_shared::{load_config, load_config_from, validate_api_key};

/// Serve the evolve and ingest triggers over HTTP.
#[derive(Parser)]
#[command(name = "articlesmith-server", version, long_about = None)]
struct Args {
    /// Config file to load instead of ~/.articlesmith/articlesmith.toml.
    #[arg(long, env = "ARTICLESMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding `[server] bind`.
    #[arg(long, env = "ARTICLESMITH_BIND")]
    bind: Option<String>,

    /// Dashboard origin allowed by CORS, overriding `[server] allowed_origin`.
    #[arg(long, env = "FRONTEND_URL")]
    allowed_origin: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match args.verbose {
        0 => "articlesmith=info",
        1 => "articlesmith=debug",
        _ => "articlesmith=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match args.log_format {
        LogFormat::Text => fmt().with_env_filter(env_filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(&args);

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(origin) = &args.allowed_origin {
        config.server.allowed_origin = origin.clone();
    }
    if let Err(e) = validate_api_key(&config) {
        warn!(error = %e, "evolve requests will fail until the model key is set");
    }

    let bind = args.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let services = Services::from_config(config).await?;
    let app = build_router(AppState::new(services));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| eyre!("failed to bind {bind}: {e}"))?;
    info!(addr = %bind, "articlesmith-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| eyre!("server failed: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
