use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use anime_recommender::core::config::Settings;
use anime_recommender::core::logging;
use anime_recommender::server;
use anime_recommender::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    logging::init(&settings);

    let state = AppState::initialize(settings)?;
    state.warm_up().await?;

    let bind_addr = state.settings.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Anime Recommender API listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down Anime Recommender API...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
