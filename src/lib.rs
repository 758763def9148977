pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/ai/chat", post(handlers::chat::chat))
        .route("/api/ai/usage", get(handlers::usage::get_usage))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .merge(handlers::docs::create_docs_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
