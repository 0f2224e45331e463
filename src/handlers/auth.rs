use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AuthError, Result},
    middleware_layer::auth::extract_token,
    models::session::{SessionContext, SessionRecord},
    services::auth::{self as auth_service, Registration},
    state::AppState,
};

/// The request payload for account registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The response payload for requests that only report an outcome.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub session: SessionRecord,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: SessionRecord,
}

/// Handles account registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("📝 Register attempt: {}", payload.username);

    let account = auth_service::register(
        &state,
        Registration {
            username: payload.username,
            full_name: payload.full_name,
            telephone: payload.telephone,
            email: payload.email,
            password: payload.password,
            confirm_password: payload.confirm_password,
            avatar: payload.avatar,
        },
    )
    .await?;

    let response = RegisterResponse {
        success: true,
        message: "Registration successful".to_string(),
        user_id: account.id,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("🔐 Login attempt: {}", payload.username);

    let (token, session) =
        auth_service::login(&state, &payload.username, &payload.password).await?;

    let response = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        session,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
///
/// Not behind the auth gate: logging out twice, or after the session has
/// expired, still succeeds as long as the token is authentic.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let token = extract_token(&headers).ok_or(AuthError::NoToken)?;
    auth_service::logout(&state, token).await?;

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the caller's session.
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response> {
    let session = auth_service::whoami(&state, &context.token).await?;

    let response = SessionResponse {
        success: true,
        session,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Refreshes the caller's session.
#[axum::debug_handler]
pub async fn refresh_session(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response> {
    let session = auth_service::refresh_session(&state, &context.token).await?;

    let response = SessionResponse {
        success: true,
        session,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
