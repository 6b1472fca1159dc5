//! Chat session registry endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use baler_engine::SessionInfo;

use crate::error::{AppError, Result};
use crate::AppState;

/// Create session registry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/{session_id}", delete(delete_session))
}

/// Standard success envelope for session responses.
#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// GET /api/sessions - sessions by most recent activity.
async fn list_sessions(State(state): State<AppState>) -> Json<Envelope<Vec<SessionInfo>>> {
    Json(Envelope {
        success: true,
        data: state.controller.list_sessions().await,
    })
}

/// Creation request; both fields may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    session_id: Option<String>,
    title: Option<String>,
}

/// Echo of a created session. The title is the caller's, absent when
/// the stored one was defaulted.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSession {
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

/// POST /api/sessions - register a session. A missing or malformed body
/// means a generated id and a defaulted title.
async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Envelope<CreatedSession>>> {
    let request: CreateSessionRequest = serde_json::from_slice(&body).unwrap_or_default();
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    state
        .controller
        .add_session(&session_id, request.title.clone(), Utc::now().timestamp_millis())
        .await?;

    Ok(Json(Envelope {
        success: true,
        data: CreatedSession {
            session_id,
            title: request.title,
        },
    }))
}

#[derive(Serialize)]
struct Deleted {
    deleted: bool,
}

/// DELETE /api/sessions/{session_id} - drop a session.
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Envelope<Deleted>>> {
    if !state.controller.remove_session(&session_id).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }
    Ok(Json(Envelope {
        success: true,
        data: Deleted { deleted: true },
    }))
}
