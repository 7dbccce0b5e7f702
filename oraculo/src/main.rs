use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oraculo::api::{create_router, AppState};
use oraculo::auth::verifier_from_config;
use oraculo::config::Config;
use oraculo::db::{Database, DatabaseBackend, LibSqlBackend, MetadataStore, LAST_SYNC_KEY};
use oraculo::ephemeris;
use oraculo::llm::LlmProvider;

#[derive(Parser)]
#[command(name = "oraculo")]
#[command(about = "Authenticated astrology chat backend with LLM fallback and answer caching")]
struct Args {
    /// Bind address, overrides ORACULO_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides ORACULO_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oraculo=info,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing primary LLM provider: {}...", llm_config.model);
        if llm_config.api_key.is_none() {
            tracing::warn!(
                "LLM_API_KEY / OPENAI_API_KEY is not set - every live answer will be the fallback message"
            );
        }
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("Primary LLM unavailable");
    }

    let fallback_llm = config.fallback_llm.as_ref().map(|fallback_config| {
        tracing::info!(
            "Initializing secondary LLM provider: {}...",
            fallback_config.model
        );
        LlmProvider::new(Some(fallback_config))
    });
    if fallback_llm.is_none() {
        tracing::warn!("No secondary LLM configured - rate-limited requests get the fallback message");
    }

    let ephemeris = ephemeris::from_config(&config.ephemeris)?;
    tracing::info!("Ephemeris source: {}", ephemeris.name());

    let verifier = verifier_from_config(&config.auth);

    let state = AppState::new(config.clone(), db, verifier, llm, fallback_llm, ephemeris)?;

    let cancel_token = CancellationToken::new();

    tracing::info!("Starting cache janitor...");
    let cache = state.resolver.cache().clone();
    let purge_every = Duration::from_secs(config.cache.purge_interval_secs.max(1));
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Cache janitor shutting down...");
                    break;
                }
                _ = tokio::time::sleep(purge_every) => {
                    let purged = cache.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = cache.len(), "Purged expired answers");
                    }
                }
            }
        }
    });

    if config.database.local_path.is_some() {
        tracing::info!("Starting replica sync...");
        let db = state.db.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Replica sync shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(60)) => {
                        match db.sync().await {
                            Ok(()) => {
                                let now = chrono::Utc::now().to_rfc3339();
                                if let Err(e) = db.set_meta(LAST_SYNC_KEY, &now).await {
                                    tracing::warn!("Failed to record sync time: {}", e);
                                }
                            }
                            Err(e) => tracing::error!("Replica sync error: {}", e),
                        }
                    }
                }
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Oráculo starting on http://{}", addr);
    tracing::info!("  Chat:         POST http://{}/chat", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
