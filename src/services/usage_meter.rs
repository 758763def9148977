use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::Config,
    errors::{AppError, Result},
    ledger::UsageLedger,
    models::{Reservation, ReserveRequest, Tier},
    services::metrics::MetricsService,
};

/// Front door to the reserve → finalize | release cycle.
///
/// Call [`UsageMeter::reserve_slot`] before the provider call, then hand the returned
/// [`Reservation`] to exactly one of [`UsageMeter::finalize`] (provider succeeded) or
/// [`UsageMeter::release`] (provider failed). No transaction stays open in between.
#[derive(Clone)]
pub struct UsageMeter {
    ledger: Arc<dyn UsageLedger>,
    metrics: Arc<MetricsService>,
    free_tier_limit: i32,
    token_reservation: i64,
}

impl UsageMeter {
    pub fn new(
        ledger: Arc<dyn UsageLedger>,
        metrics: Arc<MetricsService>,
        free_tier_limit: i32,
        token_reservation: i64,
    ) -> Self {
        Self {
            ledger,
            metrics,
            free_tier_limit,
            token_reservation,
        }
    }

    pub fn from_config(ledger: Arc<dyn UsageLedger>, metrics: Arc<MetricsService>, config: &Config) -> Self {
        Self::new(
            ledger,
            metrics,
            config.free_tier_daily_limit,
            config.token_reservation,
        )
    }

    pub fn ledger(&self) -> &Arc<dyn UsageLedger> {
        &self.ledger
    }

    pub fn free_tier_limit(&self) -> i32 {
        self.free_tier_limit
    }

    /// Reserves with the configured free-tier limit and token estimate.
    pub async fn reserve_slot(&self, user_id: Uuid, tier: Tier) -> Result<Reservation> {
        self.reserve(ReserveRequest {
            user_id,
            tier,
            free_tier_limit: self.free_tier_limit,
            estimated_tokens: Some(self.token_reservation),
        })
        .await
    }

    pub async fn reserve(&self, request: ReserveRequest) -> Result<Reservation> {
        match self.ledger.reserve(&request).await {
            Ok(reservation) => {
                self.metrics.record_reservation(&request.tier, "granted");
                tracing::debug!(
                    user_id = %request.user_id,
                    tier = %request.tier,
                    daily_used = reservation.daily_used,
                    tokens_reserved = ?reservation.tokens_reserved,
                    "AI usage slot reserved"
                );
                Ok(reservation)
            }
            Err(err) => {
                let outcome = match &err {
                    AppError::DailyLimitReached { .. } => "daily_limit",
                    AppError::InsufficientBalance { .. } => "insufficient_balance",
                    AppError::NotFound => "not_found",
                    _ => "error",
                };
                self.metrics.record_reservation(&request.tier, outcome);

                if err.is_quota_denial() {
                    tracing::info!(user_id = %request.user_id, tier = %request.tier, "AI usage denied: {}", err);
                } else {
                    tracing::error!(user_id = %request.user_id, tier = %request.tier, "AI usage reservation failed: {}", err);
                }
                Err(err)
            }
        }
    }

    /// Settles a reservation with the provider's reported usage.
    ///
    /// On error the slot stays consumed; callers log it and still deliver the reply.
    pub async fn finalize(
        &self,
        reservation: Reservation,
        input_tokens: i64,
        output_tokens: i64,
        model: &str,
    ) -> Result<()> {
        let request = reservation.into_finalize(input_tokens, output_tokens, model);
        let result = self.ledger.finalize(&request).await;

        self.metrics.record_settlement("finalize", result.is_ok());
        if result.is_ok() {
            self.metrics.record_tokens(input_tokens, output_tokens);
        }
        result
    }

    /// Gives the slot (and any reserved tokens) back after a failed provider call.
    ///
    /// Best effort: a failure here is logged and swallowed so it cannot mask the
    /// provider error the caller is already reporting.
    pub async fn release(&self, reservation: Reservation) {
        let request = reservation.into_release();

        match self.ledger.release(&request).await {
            Ok(()) => {
                self.metrics.record_settlement("release", true);
                tracing::debug!(user_id = %request.user_id, "AI usage slot released");
            }
            Err(err) => {
                self.metrics.record_settlement("release", false);
                tracing::warn!(
                    user_id = %request.user_id,
                    tier = %request.tier,
                    tokens_reserved = ?request.tokens_reserved,
                    "Failed to release AI usage slot: {}",
                    err
                );
            }
        }
    }
}
