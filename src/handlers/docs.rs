use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::chat::chat,
        crate::handlers::usage::get_usage,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
    ),
    components(
        schemas(
            crate::models::ChatRequest,
            crate::models::ChatMessage,
            crate::models::Role,
            crate::models::ChatResponse,
            crate::models::TokenUsage,
            crate::models::QuotaInfo,
            crate::models::UsageResponse,
            crate::models::UsageTotals,
            crate::models::DailyUsage,
        )
    ),
    tags(
        (name = "ai", description = "Metered AI mentor endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "My Masterpiece AI Mentor API",
        version = "0.1.0",
        description = "Metered access to the AI mentor chat"
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
