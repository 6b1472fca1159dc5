//! Sync endpoints: full pulls and id-merged pushes.
//!
//! Pulls always return the complete document set; `last_pulled_rev` is
//! just the server clock at the pull. Pushes merge by id, replacing the
//! held copy wholesale, so re-sending a batch is harmless.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

use baler_engine::{AuditLog, PullResponse, PushAck, Transaction};

use crate::error::{AppError, Result};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync/pull", get(pull_transactions))
        .route("/api/sync/push", post(push_transactions))
        .route("/api/sync/audits", get(pull_audits).post(push_audits))
}

/// GET /api/sync/pull - the full transaction set.
async fn pull_transactions(State(state): State<AppState>) -> Json<PullResponse<Transaction>> {
    Json(PullResponse {
        documents: state.controller.transactions().await,
        last_pulled_rev: Utc::now().timestamp_millis(),
    })
}

/// POST /api/sync/push - merge pushed transactions.
async fn push_transactions(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<PushAck>> {
    let documents = parse_batch(payload)?;
    let stats = state.controller.push_transactions(documents).await?;
    tracing::debug!(
        "transaction push merged: {} replaced, {} appended",
        stats.replaced,
        stats.appended
    );
    Ok(Json(PushAck {
        success: true,
        message: "Push received".to_string(),
    }))
}

/// GET /api/sync/audits - the full audit set.
async fn pull_audits(State(state): State<AppState>) -> Json<PullResponse<AuditLog>> {
    Json(PullResponse {
        documents: state.controller.audits().await,
        last_pulled_rev: Utc::now().timestamp_millis(),
    })
}

/// POST /api/sync/audits - merge pushed audit rows.
async fn push_audits(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<PushAck>> {
    let documents = parse_batch(payload)?;
    let stats = state.controller.push_audits(documents).await?;
    tracing::debug!(
        "audit push merged: {} replaced, {} appended",
        stats.replaced,
        stats.appended
    );
    Ok(Json(PushAck {
        success: true,
        message: "Audit push received".to_string(),
    }))
}

/// Decode a pushed batch, rejecting anything but an array of documents.
fn parse_batch<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>> {
    if !payload.is_array() {
        return Err(AppError::BadRequest("Invalid payload".to_string()));
    }
    serde_json::from_value(payload)
        .map_err(|_| AppError::BadRequest("Invalid payload".to_string()))
}
