use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Duration, Utc};

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::user::RequestUser,
    models::{Tier, UsageQuery, UsageResponse, UsageTotals},
    services::admission,
};

const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Current window, balance and finalized consumption for the caller.
///
/// Read-only: an elapsed window is reported as zero usage but only the next
/// reservation actually resets it.
#[utoipa::path(
    get,
    path = "/api/ai/usage",
    tag = "ai",
    params(
        UsageQuery,
        ("X-User-Id" = String, Header, description = "Account id forwarded by the gateway")
    ),
    responses(
        (status = 200, description = "Usage summary", body = UsageResponse),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_usage(
    State(state): State<AppState>,
    user: RequestUser,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>> {
    let ledger = state.meter.ledger();
    let account = ledger.account(user.id).await?.ok_or(AppError::NotFound)?;

    let now = Utc::now();
    let to = query.to.unwrap_or_else(|| now.date_naive());
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_HISTORY_DAYS))
            .ok_or_else(|| AppError::Validation("'to' is out of range".to_string()))?,
    };

    if from > to {
        return Err(AppError::Validation(
            "'from' must not be after 'to'".to_string(),
        ));
    }

    let daily_breakdown = ledger.daily_usage(user.id, from, to).await?;

    Ok(Json(UsageResponse {
        daily_messages_used: admission::effective_usage(&account.usage, now),
        daily_limit: (account.tier == Tier::Free).then(|| state.meter.free_tier_limit()),
        window_resets_at: admission::window_resets_at(&account.usage, now),
        token_balance: account.usage.token_balance,
        totals: UsageTotals::from_daily(&daily_breakdown),
        daily_breakdown,
        tier: account.tier,
    }))
}
