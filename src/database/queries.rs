use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::*;

pub struct AccountQueries;

impl AccountQueries {
    pub async fn create_account(
        pool: &PgPool,
        email: &str,
        tier: &Tier,
        token_balance: i64,
    ) -> Result<AccountRow> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO users (email, tier, token_balance)
            VALUES ($1, $2, $3)
            RETURNING id, tier, daily_messages_used, daily_messages_reset_at, token_balance
            "#,
        )
        .bind(email)
        .bind(tier.as_str())
        .bind(token_balance)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, tier, daily_messages_used, daily_messages_reset_at, token_balance
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Reads the metering columns and holds the row lock until the transaction ends.
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, tier, daily_messages_used, daily_messages_reset_at, token_balance
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    pub async fn store_usage(conn: &mut PgConnection, id: Uuid, usage: &UsageSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET daily_messages_used = $1,
                daily_messages_reset_at = $2,
                token_balance = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(usage.daily_messages_used)
        .bind(usage.daily_messages_reset_at)
        .bind(usage.token_balance)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn adjust_balance(conn: &mut PgConnection, id: Uuid, delta: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET token_balance = GREATEST(token_balance + $1, 0),
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Undoes one reservation in a single statement. Returns false when the account is gone.
    pub async fn release_slot(pool: &PgPool, id: Uuid, refund: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET daily_messages_used = GREATEST(daily_messages_used - 1, 0),
                token_balance = token_balance + $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(refund)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Test and seed helper: rewinds an account's usage window.
    pub async fn set_daily_usage(
        pool: &PgPool,
        id: Uuid,
        used: i32,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET daily_messages_used = $1, daily_messages_reset_at = $2 WHERE id = $3")
            .bind(used)
            .bind(reset_at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

pub struct UsageLogQueries;

impl UsageLogQueries {
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        input_tokens: i64,
        output_tokens: i64,
        model: &str,
    ) -> Result<UsageLog> {
        let log = sqlx::query_as::<_, UsageLog>(
            r#"
            INSERT INTO ai_usage_logs (user_id, input_tokens, output_tokens, model)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, input_tokens, output_tokens, model, created_at
            "#,
        )
        .bind(user_id)
        .bind(input_tokens)
        .bind(output_tokens)
        .bind(model)
        .fetch_one(&mut *conn)
        .await?;

        Ok(log)
    }

    pub async fn list_by_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<UsageLog>> {
        let logs = sqlx::query_as::<_, UsageLog>(
            r#"
            SELECT id, user_id, input_tokens, output_tokens, model, created_at
            FROM ai_usage_logs
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn daily_usage(
        pool: &PgPool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>> {
        let start = from.and_time(NaiveTime::MIN).and_utc();
        // Exclusive upper bound; the last representable day has no successor.
        let end = match to.succ_opt() {
            Some(next) => next.and_time(NaiveTime::MIN).and_utc(),
            None => DateTime::<Utc>::MAX_UTC,
        };

        let rows = sqlx::query_as::<_, DailyUsage>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS date,
                   COUNT(*) AS requests,
                   COALESCE(SUM(input_tokens), 0)::BIGINT AS input_tokens,
                   COALESCE(SUM(output_tokens), 0)::BIGINT AS output_tokens
            FROM ai_usage_logs
            WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
            GROUP BY 1
            ORDER BY 1 DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
