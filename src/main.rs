use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bandstand::{config::Config, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let shutdown = CancellationToken::new();
    let sweeper = state.sweeper().spawn(shutdown.clone());
    tracing::info!(
        "✅ Session sweeper started (every {} ms)",
        config.sweep_interval.as_millis()
    );

    let app = bandstand::app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("🛑 Shutdown signal received");
        })
        .await?;

    shutdown.cancel();
    sweeper.await?;
    tracing::info!("👋 Server stopped");

    Ok(())
}
