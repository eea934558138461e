use resume_review_server::{
    api::{self, AppState},
    bootstrap,
    config::ServerConfig,
    error::ServerError,
};
use rootcause::prelude::Report;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<ServerError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| ServerError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    let engine = bootstrap::engine(&config).await?;

    // Spawn periodic waitpoint pruning task
    let prune_engine = engine.clone();
    let prune_interval_secs = config.prune_interval_seconds.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(prune_interval_secs));
        loop {
            interval.tick().await;
            let pruned = prune_engine.prune_waitpoints();
            if pruned > 0 {
                tracing::debug!(pruned_waitpoints = pruned, "Periodic waitpoint cleanup");
            }
        }
    });

    let app = api::router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| ServerError::Serve {
            details: format!("failed to bind to {}: {e}", config.bind_addr),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve {
            details: e.to_string(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
