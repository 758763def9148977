use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    database::{
        queries::{AccountQueries, UsageLogQueries},
        Database,
    },
    errors::{AppError, Result},
    ledger::UsageLedger,
    models::{Account, DailyUsage, FinalizeRequest, ReleaseRequest, Reservation, ReserveRequest},
    services::admission,
};

/// Ledger backed by the `users` and `ai_usage_logs` tables.
///
/// Reservations hold `SELECT ... FOR UPDATE` on the user row for the length of the
/// transaction, which serializes them across every instance sharing the database.
pub struct PgLedger {
    database: Database,
}

impl PgLedger {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl UsageLedger for PgLedger {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>> {
        let row = AccountQueries::find_by_id(self.database.pool(), user_id).await?;
        Ok(row.map(Account::from))
    }

    async fn reserve(&self, request: &ReserveRequest) -> Result<Reservation> {
        let mut tx = self.database.pool().begin().await?;

        // Dropping `tx` on any early return rolls the transaction back.
        let row = AccountQueries::lock_for_update(&mut tx, request.user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let stored = Account::from(row);
        if stored.tier != request.tier {
            tracing::warn!(
                user_id = %request.user_id,
                requested = %request.tier,
                stored = %stored.tier,
                "Tier changed since lookup; metering with the requested tier"
            );
        }

        let admission = admission::admit(
            &stored.usage,
            &request.tier,
            request.free_tier_limit,
            request.estimated_tokens,
            Utc::now(),
        )?;

        AccountQueries::store_usage(&mut tx, request.user_id, &admission.updated).await?;
        tx.commit().await?;

        Ok(Reservation {
            user_id: request.user_id,
            tier: request.tier.clone(),
            daily_used: admission.daily_used,
            limit: request.free_tier_limit,
            tokens_reserved: admission.tokens_reserved,
        })
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()> {
        let mut tx = self.database.pool().begin().await?;

        UsageLogQueries::insert(
            &mut tx,
            request.user_id,
            request.input_tokens,
            request.output_tokens,
            &request.model,
        )
        .await?;

        if let Some(delta) = admission::settlement_delta(
            &request.tier,
            request.tokens_reserved,
            request.input_tokens,
            request.output_tokens,
        ) {
            AccountQueries::adjust_balance(&mut tx, request.user_id, delta).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn release(&self, request: &ReleaseRequest) -> Result<()> {
        let refund = admission::release_refund(&request.tier, request.tokens_reserved);
        let released = AccountQueries::release_slot(self.database.pool(), request.user_id, refund).await?;

        if !released {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn daily_usage(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>> {
        UsageLogQueries::daily_usage(self.database.pool(), user_id, from, to).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.database.pool()).await?;
        Ok(())
    }
}
