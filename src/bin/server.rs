//! `bria-tts-server` — serves the TTS pipeline over HTTP.
//!
//! Usage:
//!   bria-tts-server --engine-url http://localhost:8080 --port 8000
//!
//! Every flag also reads a `BRIA_*` environment variable; see `--help`.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bria_tts::{
    config::{Config, LogFormat},
    engine::RemoteEngine,
    server::{serve, AppState},
};

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bria_tts=info,bria_tts_server=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.log_format);

    // The blocking HTTP client owns a runtime of its own, so the engine is
    // built (and later dropped) outside tokio.
    let engine = RemoteEngine::new(
        &config.engine_url,
        Duration::from_secs(config.engine_timeout_secs),
    )
    .with_context(|| format!("Cannot create speech engine client for {}", config.engine_url))?;
    tracing::info!(endpoint = engine.endpoint(), "Speech engine configured");

    tracing::info!("Loading language models…");
    let state = Arc::new(AppState::new(Arc::new(engine), config.service_settings()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(async {
        let addr = config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Cannot bind {}", addr))?;
        serve(listener, Arc::clone(&state)).await.context("Server error")
    })?;

    drop(runtime);
    drop(state);
    tracing::info!("Stopped");
    Ok(())
}
