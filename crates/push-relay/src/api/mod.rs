//! HTTP surface: action invocations, inbound deliveries and health.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::bridge::Bridge;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Bridge,
}

impl AppState {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }
}

/// Create the API router with the default per-action quota.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with a custom per-action quota.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let limited = Router::new()
        .route("/v1/actions/:action", post(handlers::invoke))
        .route_layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health and transport deliveries are never rate limited
        .route("/health", get(handlers::health))
        .route("/v1/deliveries", post(handlers::deliveries))
        .merge(limited)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
