use std::sync::Arc;

use masterpiece_ai_meter::{
    config::Config,
    create_app,
    ledger::create_ledger,
    middleware::cors::cors_layer,
    services::{ai_provider::AnthropicProvider, metrics::MetricsService, usage_meter::UsageMeter},
    AppState,
};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "masterpiece_ai_meter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if config.ai.api_key.is_empty() {
        tracing::warn!("ANTHROPIC_API_KEY is not set; every chat request will fail and be released");
    }

    let metrics = Arc::new(MetricsService::new()?);
    let ledger = create_ledger(&config).await?;
    tracing::info!("Usage ledger ready ({:?})", config.ledger_backend);

    let provider = Arc::new(AnthropicProvider::new(&config.ai)?);
    let meter = UsageMeter::from_config(ledger, metrics.clone(), &config);

    let state = AppState {
        meter,
        provider,
        metrics,
    };

    let app = create_app(state).layer(cors_layer(&config.cors_allowed_origins)?);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("AI mentor service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
