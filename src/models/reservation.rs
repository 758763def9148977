use serde::Serialize;
use uuid::Uuid;

use super::{QuotaInfo, Tier};

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub user_id: Uuid,
    pub tier: Tier,
    pub free_tier_limit: i32,
    /// Tokens to hold back for a paid account. Falls back to the default reservation.
    pub estimated_tokens: Option<i64>,
}

/// A granted usage slot.
///
/// A reservation is consumed by exactly one of [`Reservation::into_finalize`] or
/// [`Reservation::into_release`], so a request cannot settle the same slot twice.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub user_id: Uuid,
    pub tier: Tier,
    pub daily_used: i32,
    pub limit: i32,
    pub tokens_reserved: Option<i64>,
}

impl Reservation {
    /// Usage figures reported back to free-tier clients.
    pub fn quota(&self) -> Option<QuotaInfo> {
        match self.tier {
            Tier::Free => Some(QuotaInfo {
                used: self.daily_used,
                limit: self.limit,
            }),
            _ => None,
        }
    }

    pub fn into_finalize(
        self,
        input_tokens: i64,
        output_tokens: i64,
        model: impl Into<String>,
    ) -> FinalizeRequest {
        FinalizeRequest {
            user_id: self.user_id,
            input_tokens,
            output_tokens,
            model: model.into(),
            tier: self.tier,
            tokens_reserved: self.tokens_reserved,
        }
    }

    pub fn into_release(self) -> ReleaseRequest {
        ReleaseRequest {
            user_id: self.user_id,
            tier: self.tier,
            tokens_reserved: self.tokens_reserved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub user_id: Uuid,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub model: String,
    pub tier: Tier,
    pub tokens_reserved: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub user_id: Uuid,
    pub tier: Tier,
    pub tokens_reserved: Option<i64>,
}
