use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Tier;

/// Append-only audit record written once per finalized AI call.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: i64,
    pub user_id: Uuid,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UsageQuery {
    /// First day (inclusive, UTC). Defaults to 30 days before `to`.
    pub from: Option<NaiveDate>,
    /// Last day (inclusive, UTC). Defaults to today.
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub requests: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UsageTotals {
    pub requests: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl UsageTotals {
    pub fn from_daily(days: &[DailyUsage]) -> Self {
        days.iter().fold(Self::default(), |mut totals, day| {
            totals.requests += day.requests;
            totals.input_tokens += day.input_tokens;
            totals.output_tokens += day.output_tokens;
            totals
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    #[schema(value_type = String)]
    pub tier: Tier,
    pub daily_messages_used: i32,
    /// Only set for free-tier accounts.
    pub daily_limit: Option<i32>,
    pub window_resets_at: Option<DateTime<Utc>>,
    pub token_balance: i64,
    pub totals: UsageTotals,
    pub daily_breakdown: Vec<DailyUsage>,
}
