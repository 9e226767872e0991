//! # HTTP Routes
//!
//! | Method | Path | Success body |
//! |--------|------|--------------|
//! | `POST` | `/v1/api/commit` | `{"height": h}` |
//! | `GET` | `/api/v1/block/:height` | `{"data": bool}` |
//! | `GET` | `/v1/api/latest-block` | `{"data": block}` |
//!
//! Malformed requests answer 400, failures 500, both as `{"error": msg}`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::SdkError;
use crate::ports::FinalitySdkApi;

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub height: u64,
    pub hash: String,
    pub timestamp: u64,
}

type SharedSdk = Arc<dyn FinalitySdkApi>;

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

impl IntoResponse for SdkError {
    fn into_response(self) -> Response {
        let status = match self {
            SdkError::InvalidBlock(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self)
    }
}

async fn commit(State(sdk): State<SharedSdk>, body: Result<Json<CommitRequest>, JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match sdk.commit(req.height, &req.hash, req.timestamp).await {
        Ok(()) => Json(json!({ "height": req.height })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn query_block(State(sdk): State<SharedSdk>, Path(height): Path<String>) -> Response {
    let Ok(height) = height.parse::<u64>() else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid height: {height}"));
    };

    match sdk.query(height).await {
        Ok(finalized) => Json(json!({ "data": finalized })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn latest_block(State(sdk): State<SharedSdk>) -> Response {
    match sdk.latest_block().await {
        Ok(block) => Json(json!({ "data": block })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn router(sdk: SharedSdk) -> Router {
    Router::new()
        .route("/v1/api/commit", post(commit))
        .route("/api/v1/block/:height", get(query_block))
        .route("/v1/api/latest-block", get(latest_block))
        .with_state(sdk)
}

/// Serves the SDK routes on `addr` until `shutdown` flips to `true` or its
/// sender is dropped.
pub async fn serve(
    addr: SocketAddr,
    sdk: SharedSdk,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("[fp-05] Finality SDK listening on {}", listener.local_addr()?);

    axum::serve(listener, router(sdk))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .inspect_err(|e| error!("[fp-05] API server failed: {}", e))
}
