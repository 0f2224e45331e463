use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, services::auth as auth_service, state::AppState};

/// Extracts the login token from the `Authorization` header.
///
/// Both `Bearer <token>` and a bare token are accepted.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// A middleware that admits only requests carrying a live session.
///
/// On success the resolved `SessionContext` is inserted into the request
/// extensions. It never modifies the session store.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers()).map(str::to_string);

    match auth_service::guard(&state, token.as_deref()).await {
        Ok(context) => {
            tracing::debug!("✅ Session admitted: {}", context.session.session_id);
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(reason) => AppError::Auth(reason).into_response(),
    }
}
