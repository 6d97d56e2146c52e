use std::future::Future;

use anyhow::Context;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::transcript::{TranscriptError, TranscriptService};
use crate::{Result, ServiceError};

/// Payload of `GET /`
pub const GREETING: &str = "Ram Ram";

/// Message returned for every upstream failure that is not classified
pub const GENERIC_FAILURE: &str = "Failed to fetch transcript. Please try again later.";

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub transcripts: TranscriptService,
}

impl AppState {
    pub fn new(transcripts: TranscriptService) -> Self {
        Self { transcripts }
    }
}

/// Successful transcript response
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

/// Error response: a status plus a client-safe message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Map a classified failure to its HTTP status and log it. Upstream detail
    /// stays in the log.
    fn from_transcript_error(video_id: &str, err: TranscriptError) -> Self {
        match err {
            TranscriptError::InvalidVideoId => {
                tracing::debug!(video_id, "Rejected invalid video ID");
                Self::new(StatusCode::BAD_REQUEST, "Invalid video ID")
            }
            TranscriptError::Disabled => {
                tracing::warn!(video_id, "Transcript disabled");
                Self::new(StatusCode::FORBIDDEN, "Transcript is disabled for this video")
            }
            TranscriptError::NotFound => {
                tracing::warn!(video_id, "No transcript found");
                Self::new(StatusCode::NOT_FOUND, "No transcript found")
            }
            TranscriptError::VideoUnavailable(reason) => {
                tracing::warn!(video_id, %reason, "Video unavailable");
                Self::new(StatusCode::NOT_FOUND, "Video unavailable")
            }
            TranscriptError::Empty => {
                tracing::warn!(video_id, "Transcript is empty");
                Self::new(StatusCode::NOT_FOUND, "Empty transcript")
            }
            TranscriptError::Upstream(detail) => {
                tracing::error!(video_id, %detail, "Transcript fetch error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/transcript", get(missing_video_id))
        .route("/api/transcript/", get(missing_video_id))
        .route("/api/transcript/{video_id}", get(get_transcript))
        .route("/api/transcript/{video_id}/", get(get_transcript))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the configured address and serve until Ctrl+C
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: addr.clone(),
            source,
        })?;

    run(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    tracing::info!(
        port = local_addr.port(),
        source = state.transcripts.source_name(),
        "Server running on {}",
        local_addr
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("running HTTP server")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn root() -> Json<&'static str> {
    Json(GREETING)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn missing_video_id() -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "Invalid video ID")
}

async fn get_transcript(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> ApiResult<Json<TranscriptResponse>> {
    // a segment that does not percent-decode to UTF-8 is still a bad id
    let Path(video_id) = path.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected undecodable video ID");
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid video ID")
    })?;

    let result = state
        .transcripts
        .fetch_transcript(&video_id)
        .await
        .map_err(|err| ApiError::from_transcript_error(&video_id, err))?;

    Ok(Json(TranscriptResponse {
        transcript: result.transcript,
    }))
}
