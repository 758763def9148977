use chrono::{Duration, Utc};
use futures::future::join_all;
use masterpiece_ai_meter::{
    database::{
        queries::{AccountQueries, UsageLogQueries},
        Database,
    },
    errors::AppError,
    ledger::{PgLedger, UsageLedger},
    models::{ReleaseRequest, ReserveRequest, Tier},
};
use serial_test::serial;
use std::{env, sync::Arc};
use uuid::Uuid;

/// Connects to `TEST_DATABASE_URL`; the tests are skipped when it is not set.
async fn setup_test_db() -> Option<PgLedger> {
    let database_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres ledger test");
            return None;
        }
    };

    let db = Database::new(&database_url, 10)
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");

    sqlx::query("TRUNCATE TABLE ai_usage_logs, users RESTART IDENTITY CASCADE")
        .execute(db.pool())
        .await
        .expect("Failed to clean test database");

    Some(PgLedger::new(db))
}

async fn create_account(ledger: &PgLedger, tier: Tier, token_balance: i64) -> Uuid {
    let email = format!("mentee_{}@example.com", Uuid::new_v4());
    AccountQueries::create_account(ledger.database().pool(), &email, &tier, token_balance)
        .await
        .unwrap()
        .id
}

fn reserve(user_id: Uuid, tier: Tier, limit: i32, estimate: Option<i64>) -> ReserveRequest {
    ReserveRequest {
        user_id,
        tier,
        free_tier_limit: limit,
        estimated_tokens: estimate,
    }
}

#[tokio::test]
#[serial]
async fn test_concurrent_reservations_are_serialized_by_row_lock() {
    let Some(ledger) = setup_test_db().await else { return };
    let ledger = Arc::new(ledger);
    let id = create_account(&ledger, Tier::Free, 0).await;

    let attempts = (0..8).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.reserve(&reserve(id, Tier::Free, 5, None)).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::DailyLimitReached { .. })))
            .count(),
        3
    );

    let account = ledger.account(id).await.unwrap().unwrap();
    assert_eq!(account.usage.daily_messages_used, 5);
}

#[tokio::test]
#[serial]
async fn test_paid_reservation_and_settlement() {
    let Some(ledger) = setup_test_db().await else { return };
    let id = create_account(&ledger, Tier::Paid, 10_000).await;

    let reservation = ledger
        .reserve(&reserve(id, Tier::Paid, 5, Some(2000)))
        .await
        .unwrap();
    assert_eq!(reservation.tokens_reserved, Some(2000));
    assert_eq!(ledger.account(id).await.unwrap().unwrap().usage.token_balance, 8000);

    ledger
        .finalize(&reservation.into_finalize(150, 350, "claude-test"))
        .await
        .unwrap();

    let account = ledger.account(id).await.unwrap().unwrap();
    assert_eq!(account.usage.token_balance, 9500);

    let logs = UsageLogQueries::list_by_user(ledger.database().pool(), id, 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].input_tokens, 150);
    assert_eq!(logs[0].output_tokens, 350);
    assert_eq!(logs[0].model, "claude-test");

    let today = Utc::now().date_naive();
    let days = ledger.daily_usage(id, today, today).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].requests, 1);
    assert_eq!(days[0].input_tokens, 150);
}

#[tokio::test]
#[serial]
async fn test_insufficient_balance_rolls_back() {
    let Some(ledger) = setup_test_db().await else { return };
    let id = create_account(&ledger, Tier::Paid, 100).await;

    let err = ledger
        .reserve(&reserve(id, Tier::Paid, 5, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance { balance: 100, .. }));

    let account = ledger.account(id).await.unwrap().unwrap();
    assert_eq!(account.usage.token_balance, 100);
    assert_eq!(account.usage.daily_messages_used, 0);
    assert_eq!(account.usage.daily_messages_reset_at, None);
}

#[tokio::test]
#[serial]
async fn test_release_restores_counter_and_balance() {
    let Some(ledger) = setup_test_db().await else { return };
    let id = create_account(&ledger, Tier::Paid, 6000).await;

    let reservation = ledger
        .reserve(&reserve(id, Tier::Paid, 5, Some(2500)))
        .await
        .unwrap();
    ledger.release(&reservation.into_release()).await.unwrap();

    let account = ledger.account(id).await.unwrap().unwrap();
    assert_eq!(account.usage.daily_messages_used, 0);
    assert_eq!(account.usage.token_balance, 6000);
}

#[tokio::test]
#[serial]
async fn test_stale_window_resets() {
    let Some(ledger) = setup_test_db().await else { return };
    let id = create_account(&ledger, Tier::Free, 0).await;
    AccountQueries::set_daily_usage(
        ledger.database().pool(),
        id,
        5,
        Some(Utc::now() - Duration::hours(26)),
    )
    .await
    .unwrap();

    let reservation = ledger.reserve(&reserve(id, Tier::Free, 5, None)).await.unwrap();
    assert_eq!(reservation.daily_used, 1);

    let account = ledger.account(id).await.unwrap().unwrap();
    assert_eq!(account.usage.daily_messages_used, 1);
    assert!(Utc::now() - account.usage.daily_messages_reset_at.unwrap() < Duration::minutes(1));
}

#[tokio::test]
#[serial]
async fn test_missing_account() {
    let Some(ledger) = setup_test_db().await else { return };

    let err = ledger
        .reserve(&reserve(Uuid::new_v4(), Tier::Free, 5, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = ledger
        .release(&ReleaseRequest {
            user_id: Uuid::new_v4(),
            tier: Tier::Free,
            tokens_reserved: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
