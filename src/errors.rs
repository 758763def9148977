use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ai_provider::ProviderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Account not found")]
    NotFound,

    #[error("Daily message limit reached ({used}/{limit})")]
    DailyLimitReached { used: i32, limit: i32 },

    #[error("Insufficient token balance ({balance} available, {required} required)")]
    InsufficientBalance { balance: i64, required: i64 },

    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DailyLimitReached { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Admission denials are final for the current window; clients must not retry them.
    pub fn is_quota_denial(&self) -> bool {
        matches!(
            self,
            AppError::DailyLimitReached { .. } | AppError::InsufficientBalance { .. }
        )
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Provider(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                json!({ "error": "Database error", "status": status.as_u16() })
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {}", e);
                json!({ "error": "Database error", "status": status.as_u16() })
            }
            AppError::Unauthorized(ref msg) | AppError::Validation(ref msg) => {
                json!({ "error": msg, "status": status.as_u16() })
            }
            AppError::NotFound => json!({ "error": "Account not found", "status": status.as_u16() }),
            AppError::DailyLimitReached { used, limit } => json!({
                "error": "Daily message limit reached. Upgrade your plan or try again tomorrow.",
                "status": status.as_u16(),
                "retryable": false,
                "used": used,
                "limit": limit
            }),
            AppError::InsufficientBalance { balance, required } => json!({
                "error": "Insufficient token balance. Add credit to keep chatting.",
                "status": status.as_u16(),
                "retryable": false,
                "token_balance": balance,
                "required": required
            }),
            AppError::Provider(ref msg) => {
                tracing::error!("AI provider error: {}", msg);
                json!({
                    "error": "The AI mentor is unavailable right now, please retry",
                    "status": status.as_u16(),
                    "retryable": true
                })
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                json!({ "error": "Internal server error", "status": status.as_u16() })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_errors_map_to_distinct_statuses() {
        let daily = AppError::DailyLimitReached { used: 5, limit: 5 };
        let balance = AppError::InsufficientBalance { balance: 100, required: 2000 };

        assert_eq!(daily.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(balance.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert!(daily.is_quota_denial());
        assert!(balance.is_quota_denial());
    }

    #[test]
    fn test_operational_errors_are_server_errors() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Provider("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!AppError::NotFound.is_quota_denial());
    }

    #[tokio::test]
    async fn test_daily_limit_body_is_not_retryable() {
        let response = AppError::DailyLimitReached { used: 10, limit: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], false);
        assert_eq!(body["limit"], 10);
    }
}
