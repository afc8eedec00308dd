//! HTTP server for countdown endpoints
//!
//! Provides /, /health, /countdown.png and /countdown.gif.

use crate::coordinator::{CacheStatus, RenderCoordinator};
use crate::request::{CountdownQuery, RenderRequest};
use crate::types::HealthResponse;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use countdown_render::ImageBuilder;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";
const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub images: Arc<ImageBuilder>,
    pub coordinator: RenderCoordinator,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(images: Arc<ImageBuilder>, coordinator: RenderCoordinator) -> Self {
        Self {
            images,
            coordinator,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/countdown.png", get(countdown_png))
        .route("/countdown.gif", get(countdown_gif))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server, returning once a shutdown signal arrives
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Liveness marker
async fn index() -> &'static str {
    "countdown ok"
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        target: state.images.renderer().countdown().target().to_rfc3339(),
        in_flight: state.coordinator.in_flight().await,
        cache: state.coordinator.stats(),
    })
}

/// Static countdown image, rendered fresh on every request
async fn countdown_png(
    State(state): State<SharedState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let request = RenderRequest::still(&CountdownQuery::from_pairs(params));
    let images = Arc::clone(&state.images);

    let built =
        tokio::task::spawn_blocking(move || images.build_image(request.width, request.height))
            .await;

    match built {
        Ok(Ok(bytes)) => image_response("image/png", bytes.into(), None),
        Ok(Err(e)) => {
            error!(
                width = request.width,
                height = request.height,
                error = %e,
                "Failed to render image"
            );
            failure_response()
        }
        Err(e) => {
            error!(
                width = request.width,
                height = request.height,
                error = %e,
                "Image render task failed"
            );
            failure_response()
        }
    }
}

/// Looping countdown animation, served through the render cache
async fn countdown_gif(
    State(state): State<SharedState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let request = RenderRequest::animation(&CountdownQuery::from_pairs(params));

    match state.coordinator.get_or_build(&request).await {
        Ok(rendered) => {
            image_response("image/gif", rendered.bytes.into(), Some(rendered.status))
        }
        Err(e) => {
            error!(key = %request.cache_key(), error = %e, "Failed to serve animation");
            failure_response()
        }
    }
}

/// Headers that keep clients and intermediaries from caching the image
fn no_cache_headers() -> [(HeaderName, &'static str); 4] {
    [
        (header::CACHE_CONTROL, NO_STORE),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
        (SURROGATE_CONTROL, "no-store"),
    ]
}

fn image_response(
    content_type: &'static str,
    body: Body,
    status: Option<CacheStatus>,
) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        no_cache_headers(),
        body,
    )
        .into_response();

    if let Some(status) = status {
        response
            .headers_mut()
            .insert(X_CACHE, header::HeaderValue::from_static(status.as_str()));
    }
    response
}

fn failure_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        no_cache_headers(),
        Body::empty(),
    )
        .into_response()
}
