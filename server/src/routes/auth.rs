//! Login and token validation endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use baler_engine::{LoginRequest, LoginResponse, UserInfo, ValidateResponse};

use crate::auth;
use crate::error::{AppError, Result};
use crate::AppState;

/// Create auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/validate", get(validate))
}

/// POST /api/auth/login - exchange demo credentials for a signed token.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let Some(role) = auth::authenticate(&request.email, &request.password) else {
        tracing::debug!("login rejected for {}", request.email);
        return Err(AppError::Unauthorized);
    };

    let token = auth::issue_token(&request.email, role, &state.config)?;
    tracing::info!("Login succeeded for {} as {:?}", request.email, role);
    Ok(Json(LoginResponse {
        token,
        user: UserInfo { role },
    }))
}

/// GET /api/auth/validate - check a bearer token's signature and expiry.
async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<ValidateResponse>) {
    let verified = auth::bearer_token(&headers)
        .and_then(|token| auth::verify_token(token, &state.config.auth_secret));

    match verified {
        Some(claims) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                role: Some(claims.role),
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ValidateResponse {
                valid: false,
                role: None,
            }),
        ),
    }
}
