use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    ledger::UsageLedger,
    models::{
        Account, DailyUsage, FinalizeRequest, ReleaseRequest, Reservation, ReserveRequest,
        UsageLog,
    },
    services::admission,
};

/// Single-process ledger for local runs and tests.
///
/// Each account sits behind its own mutex, so reservations for one user are
/// serialized while other users proceed independently.
#[derive(Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<Uuid, Arc<Mutex<Account>>>>,
    logs: Mutex<Vec<UsageLog>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, account: Account) {
        self.accounts
            .write()
            .await
            .insert(account.id, Arc::new(Mutex::new(account)));
    }

    pub async fn usage_logs(&self, user_id: Uuid) -> Vec<UsageLog> {
        self.logs
            .lock()
            .await
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn slot(&self, user_id: Uuid) -> Option<Arc<Mutex<Account>>> {
        self.accounts.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl UsageLedger for MemoryLedger {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>> {
        match self.slot(user_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn reserve(&self, request: &ReserveRequest) -> Result<Reservation> {
        let slot = self.slot(request.user_id).await.ok_or(AppError::NotFound)?;
        let mut account = slot.lock().await;

        let admission = admission::admit(
            &account.usage,
            &request.tier,
            request.free_tier_limit,
            request.estimated_tokens,
            Utc::now(),
        )?;
        account.usage = admission.updated;

        Ok(Reservation {
            user_id: request.user_id,
            tier: request.tier.clone(),
            daily_used: admission.daily_used,
            limit: request.free_tier_limit,
            tokens_reserved: admission.tokens_reserved,
        })
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()> {
        let slot = self.slot(request.user_id).await.ok_or(AppError::NotFound)?;
        let mut account = slot.lock().await;

        {
            let mut logs = self.logs.lock().await;
            let id = logs.len() as i64 + 1;
            logs.push(UsageLog {
                id,
                user_id: request.user_id,
                input_tokens: request.input_tokens,
                output_tokens: request.output_tokens,
                model: request.model.clone(),
                created_at: Utc::now(),
            });
        }

        if let Some(delta) = admission::settlement_delta(
            &request.tier,
            request.tokens_reserved,
            request.input_tokens,
            request.output_tokens,
        ) {
            account.usage.token_balance = admission::apply_settlement(account.usage.token_balance, delta);
        }

        Ok(())
    }

    async fn release(&self, request: &ReleaseRequest) -> Result<()> {
        let slot = self.slot(request.user_id).await.ok_or(AppError::NotFound)?;
        let mut account = slot.lock().await;

        account.usage = admission::release(&account.usage, &request.tier, request.tokens_reserved);
        Ok(())
    }

    async fn daily_usage(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>> {
        let logs = self.logs.lock().await;

        let mut days: BTreeMap<NaiveDate, DailyUsage> = BTreeMap::new();
        for log in logs.iter().filter(|log| log.user_id == user_id) {
            let date = log.created_at.date_naive();
            if date < from || date > to {
                continue;
            }
            let day = days.entry(date).or_insert_with(|| DailyUsage {
                date,
                requests: 0,
                input_tokens: 0,
                output_tokens: 0,
            });
            day.requests += 1;
            day.input_tokens += log.input_tokens;
            day.output_tokens += log.output_tokens;
        }

        Ok(days.into_values().rev().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
