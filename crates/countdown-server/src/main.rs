//! Countdown image server
//!
//! Renders a countdown to a fixed deadline as a PNG or a looping GIF, for
//! places that cannot run scripts such as email clients. Animations go through
//! an in-memory render cache that runs at most one build per parameter set.

mod config;
mod coordinator;
mod error;
mod request;
mod server;
mod types;

use crate::config::CountdownConfig;
use crate::coordinator::{CoordinatorConfig, RenderCoordinator};
use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use countdown_render::{FrameRenderer, FrameStyle, ImageBuilder, Rasterizer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("countdown_server=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting countdown server...");

    let config = CountdownConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Target: {}", config.countdown.target().to_rfc3339());
    info!("Cache TTL: {} seconds", config.cache_ttl.as_secs());
    info!("Max concurrent builds: {}", config.max_concurrent_builds);

    let rasterizer = Rasterizer::new(config.font_dir.as_deref());
    info!("Font faces: {}", rasterizer.font_faces());

    let style = FrameStyle {
        title: config.title.clone(),
        ..FrameStyle::default()
    };
    let images = Arc::new(ImageBuilder::new(
        FrameRenderer::new(config.countdown, style),
        rasterizer,
    ));

    let coordinator = RenderCoordinator::new(
        images.clone(),
        CoordinatorConfig {
            ttl: config.cache_ttl,
            max_entries: config.cache_max_entries,
            max_concurrent_builds: config.max_concurrent_builds,
        },
    );

    // Create shared state
    let state: SharedState = Arc::new(ServerState::new(images, coordinator));

    // Start HTTP server (blocking until shutdown)
    start_server(state, config.port).await?;

    Ok(())
}
