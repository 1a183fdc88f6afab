use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use notes_backend_lib::{
    config::{LogFormat, Settings, DEFAULT_CONFIG_FILE},
    router, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Notes REST backend
#[derive(Parser, Debug)]
#[command(name = "notes-server")]
#[command(about = "Personal notes REST API with adaptive login rate limiting")]
struct Args {
    /// Configuration file (TOML); missing file means defaults + environment
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    match settings.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }
    settings.validate()?;

    init_tracing(&settings);

    let addr = settings.bind_addr;
    info!(
        threshold = settings.login_limit.threshold,
        base_lockout_secs = settings.login_limit.base_lockout_secs,
        max_lockout_secs = ?settings.login_limit.max_lockout_secs,
        idle_eviction_secs = ?settings.login_limit.idle_eviction_secs,
        "login rate limiter configured"
    );

    let state = AppState::in_memory(settings);
    state.spawn_background_tasks();

    let app = router::create_router(Arc::new(state));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    // peer addresses feed the login rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
