//! Session-authenticated HTTP backend for the bandstand service.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod account;
    pub mod session;
}

pub mod repositories {
    pub mod account;
    pub mod session;
}

pub mod services {
    pub mod auth;
    pub mod sweeper;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Builds the HTTP router.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/authentication/register", post(handlers::auth::register))
        .route("/authentication/login", post(handlers::auth::login))
        .route("/authentication/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/authentication/session",
            get(handlers::auth::get_session).put(handlers::auth::refresh_session),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors)
}
