//! Exhibitly - A social art-sharing gallery

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exhibitly::{
    api::{self, AppState},
    config::Config,
    services::AuthEvent,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exhibitly=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Exhibitly...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config).await?;

    // Log auth state changes
    {
        let mut events = state.sessions.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => log_auth_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Auth event log lagged by {} events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Demo mode runs on seeded in-memory adapters
#[cfg(feature = "demo")]
async fn build_state(config: Config) -> Result<AppState> {
    use exhibitly::{backend::DynStore, demo, media::DynUploader};

    tracing::info!("Demo mode: using in-memory backend and media storage");
    let (store, uploader) = demo::seeded(&config.server.public_url)
        .await
        .context("Failed to seed demo data")?;

    let state = AppState::new(config, store as DynStore, uploader.clone() as DynUploader)?;
    Ok(state.with_demo_media(uploader))
}

#[cfg(not(feature = "demo"))]
async fn build_state(config: Config) -> Result<AppState> {
    use exhibitly::{backend::SupabaseStore, media::CloudinaryUploader};
    use std::sync::Arc;

    let store = SupabaseStore::new(&config.backend).context("Backend is not usable (set backend.url and backend.anon_key)")?;
    tracing::info!("Backend: {}", config.backend.url);

    let uploader =
        CloudinaryUploader::new(&config.media).context("Media CDN is not usable (set media.cloud_name and media.upload_preset)")?;
    tracing::info!("Media CDN: {}", config.media.cloud_name);

    Ok(AppState::new(config, Arc::new(store), Arc::new(uploader))?)
}

fn log_auth_event(event: &AuthEvent) {
    match event {
        AuthEvent::SessionLost(id) => tracing::warn!("Session lost for {}", id),
        other => tracing::info!("Auth event: {:?}", other),
    }
}
