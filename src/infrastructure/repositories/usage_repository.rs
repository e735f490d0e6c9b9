use crate::domain::billing::quota::{decide_charge, Charge, Quota, OPERATION_COST};
use crate::domain::admin::{ActivityFilter, UsageActivity};
use crate::domain::billing::OperationCount;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Charge one metered operation against the user's allowance or balance
    /// and count it. `None` when the user does not exist. `Insufficient`
    /// leaves storage untouched.
    async fn record_operation(
        &self,
        user_id: Uuid,
        operation: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Charge>>;

    /// Per-operation counts for the user since `since`
    async fn usage_since(&self, user_id: Uuid, since: NaiveDate) -> AppResult<Vec<OperationCount>>;

    /// Copy the user's counters to the archive and delete them.
    /// Returns the number of rows archived.
    async fn archive_and_clear(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>;

    /// Per-operation totals across all users since `since`
    async fn totals_since(&self, since: NaiveDate) -> AppResult<Vec<OperationCount>>;

    /// Daily counters on or after the window's start day, newest first
    async fn activity_since(&self, filter: &ActivityFilter) -> AppResult<Vec<UsageActivity>>;
}

pub struct PgUsageRepository {
    pool: Arc<DbPool>,
}

impl PgUsageRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn record_operation(
        &self,
        user_id: Uuid,
        operation: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Charge>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, DateTime<Utc>, Decimal)> = sqlx::query_as(
            r#"
            SELECT free_operations_used, free_operations_reset, balance
            FROM users WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((used, reset_at, balance)) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let quota = Quota::at(used, reset_at, now);
        let charge = decide_charge(&quota, balance);

        match charge {
            Charge::Insufficient { .. } => {
                tx.rollback().await?;
                return Ok(Some(charge));
            }
            Charge::Free { used, .. } => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET free_operations_used = $2, free_operations_reset = $3, updated_at = $4
                    WHERE id = $1
                    "#,
                )
                .bind(user_id)
                .bind(used)
                .bind(quota.next_reset)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            Charge::Balance { new_balance } => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET balance = $2, free_operations_used = $3, free_operations_reset = $4, updated_at = $5
                    WHERE id = $1
                    "#,
                )
                .bind(user_id)
                .bind(new_balance)
                .bind(quota.used)
                .bind(quota.next_reset)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO transactions (id, user_id, amount, balance_after, description, status, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, 'completed', $6, $6)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(-OPERATION_COST)
                .bind(new_balance)
                .bind(format!("Operation: {}", operation))
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO usage_stats (id, user_id, operation, date, count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 1, $5, $5)
            ON CONFLICT (user_id, operation, date)
            DO UPDATE SET
                count = usage_stats.count + 1,
                updated_at = $5
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(operation)
        .bind(now.date_naive())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(charge))
    }

    async fn usage_since(&self, user_id: Uuid, since: NaiveDate) -> AppResult<Vec<OperationCount>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, OperationCount>(
            r#"
            SELECT operation, SUM(count)::BIGINT AS count
            FROM usage_stats
            WHERE user_id = $1 AND date >= $2
            GROUP BY operation
            ORDER BY count DESC, operation
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn archive_and_clear(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;

        let archived = sqlx::query(
            r#"
            INSERT INTO usage_stats_archive (id, user_id, operation, date, count, archived_at)
            SELECT id, user_id, operation, date, count, $2
            FROM usage_stats
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM usage_stats WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(archived.rows_affected())
    }

    async fn totals_since(&self, since: NaiveDate) -> AppResult<Vec<OperationCount>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, OperationCount>(
            r#"
            SELECT operation, SUM(count)::BIGINT AS count
            FROM usage_stats
            WHERE date >= $1
            GROUP BY operation
            ORDER BY count DESC, operation
            "#,
        )
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn activity_since(&self, filter: &ActivityFilter) -> AppResult<Vec<UsageActivity>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, UsageActivity>(
            r#"
            SELECT us.id, us.user_id, u.email, u.name, us.operation, us.date, us.count
            FROM usage_stats us
            JOIN users u ON u.id = us.user_id
            WHERE us.date >= $1
              AND ($2::text IS NULL OR u.email ILIKE $2 OR u.name ILIKE $2)
            ORDER BY us.date DESC, us.count DESC
            LIMIT $3
            "#,
        )
        .bind(filter.since.date_naive())
        .bind(filter.pattern())
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
