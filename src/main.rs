use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tailwind_relay::banner::{BannerInfo, print_banner};
use tailwind_relay::config::{RelayConfig, ServerConfig};
use tailwind_relay::consts::{
    API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_MODEL,
    DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use tailwind_relay::logging;
use tailwind_relay::relay::ConversionRelay;
use tailwind_relay::server;
use tailwind_relay::upstream::gemini::{GeminiConfig, GeminiUpstream};

#[derive(Parser)]
#[command(
    name = "tailwind-relay",
    version,
    about = "CSS in, Tailwind utility classes out."
)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Gemini API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(short, long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Upstream request timeout in seconds
    #[arg(short, long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Directory with the front-end, served for every non-API path
    #[arg(long, env = "PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Allowed CORS origin, repeatable or comma-separated (default: any)
    #[arg(long = "allow-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Debug logging for this crate and the HTTP layer
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real env vars still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let relay_config = RelayConfig::new(cli.api_key);
    if !relay_config.has_api_key() {
        warn!(
            "{} is not set; every conversion will fail with a configuration error",
            API_KEY_ENV
        );
    }

    let upstream = GeminiUpstream::new(GeminiConfig {
        api_base: cli.api_base.clone(),
        model: cli.model.clone(),
        timeout: Duration::from_secs(cli.timeout),
    })?;
    let has_api_key = relay_config.has_api_key();
    let relay = Arc::new(ConversionRelay::new(relay_config, Arc::new(upstream)));

    let server_config = ServerConfig {
        host: cli.host,
        port: cli.port,
        public_dir: cli.public_dir,
        max_body_bytes: cli.max_body_bytes,
        allowed_origins: cli
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
    };

    let app = server::router(Arc::clone(&relay), &server_config)?;

    let addr = server_config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    print_banner(&BannerInfo {
        addr: &addr,
        model: relay.model(),
        api_base: &cli.api_base,
        has_api_key,
        public_dir: server_config.public_dir.as_deref(),
        max_body_bytes: server_config.max_body_bytes,
    });

    server::serve(listener, app, shutdown_signal()).await?;

    info!("goodbye.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
