use collections_online::{app, config::config, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SESSION_SECRET, GOOGLE_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = config()?;
    tracing::info!("Starting Collections Online in {:?} mode", config.environment);

    let state = AppState::new(config.clone())?;
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Collections Online listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
