//! # HTTP Control Surface
//!
//! JSON endpoints in front of the relay's control operations.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET | `/values` | - | `{"yaw":f,"pitch":f,"roll":f}` |
//! | GET | `/config` | - | `{"yaw":n,"pitch":n,"roll":n}` |
//! | POST | `/config` | `{"yaw"?:n,"pitch"?:n,"roll"?:n}` | `{"success":bool}` |
//! | POST | `/test-channel?channel=N` | - | `{"success":bool}` |
//!
//! Failures carry `"success": false` and a `"message"`, with status 400 for
//! rejected requests and 503 if the relay loop is gone.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::control::{saturating_index, ConfigUpdate, StatusResponse};
use crate::error::{RelayError, Result};
use crate::relay::RelayHandle;

/// Query string of `POST /test-channel`.
#[derive(Debug, Deserialize)]
pub struct TestChannelParams {
    pub channel: Option<String>,
}

impl TestChannelParams {
    /// Channel index requested, if the parameter is present.
    ///
    /// Fractions truncate and out-of-range numbers saturate; anything that
    /// is not a number reads as channel 0.
    pub fn channel_index(&self) -> Option<i64> {
        self.channel.as_deref().map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map(saturating_index)
                .unwrap_or(0)
        })
    }
}

/// Build the control router over a relay handle.
pub fn router(relay: RelayHandle) -> Router {
    Router::new()
        .route("/values", get(read_values))
        .route("/config", get(read_config).post(write_config))
        .route("/test-channel", post(test_channel))
        .with_state(relay)
}

/// Serve the control surface on `listener` until the server fails.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if the server stops with an I/O error.
pub async fn serve(listener: TcpListener, relay: RelayHandle) -> Result<()> {
    info!("Control surface listening on {}", listener.local_addr()?);
    axum::serve(listener, router(relay)).await?;
    Ok(())
}

async fn read_values(State(relay): State<RelayHandle>) -> Response {
    match relay.read_values().await {
        Ok(values) => Json(values).into_response(),
        Err(e) => error_response(e),
    }
}

async fn read_config(State(relay): State<RelayHandle>) -> Response {
    match relay.read_config().await {
        Ok(assignment) => Json(assignment).into_response(),
        Err(e) => error_response(e),
    }
}

async fn write_config(State(relay): State<RelayHandle>, body: Bytes) -> Response {
    let update = match ConfigUpdate::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejected config body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(StatusResponse::failure("Invalid JSON")),
            )
                .into_response();
        }
    };

    match relay.write_config(update).await {
        Ok(_) => Json(StatusResponse::ok()).into_response(),
        Err(e) => error_response(e),
    }
}

async fn test_channel(
    State(relay): State<RelayHandle>,
    Query(params): Query<TestChannelParams>,
) -> Response {
    match relay.test_channel(params.channel_index()).await {
        Ok(_) => Json(StatusResponse::ok()).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: RelayError) -> Response {
    let status = match err {
        RelayError::DuplicateChannelAssignment { .. } | RelayError::MissingParameter(_) => {
            StatusCode::BAD_REQUEST
        }
        RelayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(StatusResponse::failure(err.to_string()))).into_response()
}
