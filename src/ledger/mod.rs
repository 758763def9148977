use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Config, LedgerBackend};
use crate::database::Database;
use crate::errors::Result;
use crate::models::{Account, DailyUsage, FinalizeRequest, ReleaseRequest, Reservation, ReserveRequest};

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

/// Persistent side of AI usage metering.
///
/// Implementations must serialize `reserve` per account (and only per account) so two
/// concurrent reservations for the same user observe each other's committed counters.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn account(&self, user_id: Uuid) -> Result<Option<Account>>;

    async fn reserve(&self, request: &ReserveRequest) -> Result<Reservation>;

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()>;

    async fn release(&self, request: &ReleaseRequest) -> Result<()>;

    /// Finalized usage grouped per UTC day, newest first. Both bounds are inclusive.
    async fn daily_usage(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>>;

    async fn ping(&self) -> Result<()>;
}

pub async fn create_ledger(config: &Config) -> Result<Arc<dyn UsageLedger>> {
    match config.ledger_backend {
        LedgerBackend::Postgres => {
            let database = Database::new(&config.database_url, config.database_max_connections).await?;
            database.migrate().await?;
            Ok(Arc::new(PgLedger::new(database)))
        }
        LedgerBackend::Memory => {
            tracing::warn!("Using in-memory usage ledger; counters are lost on restart and not shared between instances");
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}
