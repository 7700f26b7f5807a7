// Tollgate - Web Server
// POST /decode with a camera frame, get the toll outcome back

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;
use tollgate::api::{router, AppState};
use tollgate::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    info!("Starting tollgate server\n{}", config);

    // Building the blocking HTTP recognizer client must happen off the runtime
    let booth_config = config.clone();
    let booth = tokio::task::spawn_blocking(move || booth_config.build_booth())
        .await
        .context("Startup task failed")??;

    let state = AppState {
        booth: Arc::new(booth),
    };
    let app = router(state, config.max_payload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("🚀 Server running on http://{}", config.bind_addr);
    info!("   POST /decode  {{\"image\": \"data:image/jpeg;base64,...\"}}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
    }
}
