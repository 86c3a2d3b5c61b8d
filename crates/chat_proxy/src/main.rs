use anyhow::Context;
use chat_proxy::{router, AppState, ProxyConfig};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chat-proxy")]
#[command(about = "Streams OpenRouter chat completions as an AI SDK data stream")]
struct Args {
    /// Host to bind to (overrides CHAT_PROXY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides CHAT_PROXY_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Model identifier (overrides CHAT_PROXY_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging for the proxy crates
    #[arg(short, long)]
    verbose: bool,
}

fn initialize_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,chat_proxy={level},openrouter_api={level},chat_protocol={level}"
        ))
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.verbose);

    let mut config = ProxyConfig::from_env()?;
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    if config.api_key.is_empty() {
        tracing::warn!("OPENROUTER_API_KEY is not set; requests will fail upstream");
    }

    let addr = config.socket_addr()?;
    let app = router(AppState::new(&config)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, model = %config.model, "chat proxy listening");
    axum::serve(listener, app).await?;

    Ok(())
}
