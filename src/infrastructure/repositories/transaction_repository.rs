use crate::domain::admin::{ActivityFilter, DailyLedger, LedgerTotals, TransactionFilter, TransactionSummary};
use crate::domain::billing::Transaction;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Ledger row for a deposit awaiting provider capture
    async fn create_pending_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Transaction>;

    async fn find_by_payment_id(&self, payment_id: &str) -> AppResult<Option<Transaction>>;

    async fn find_for_user_by_payment_id(
        &self,
        user_id: Uuid,
        payment_id: &str,
    ) -> AppResult<Option<Transaction>>;

    /// Credit the owner's balance by `credited` and complete the row, in one
    /// database transaction. A failed row is settled too, since the provider
    /// confirmed the money. `None` when the row was already completed.
    async fn complete_deposit(
        &self,
        transaction_id: Uuid,
        credited: Decimal,
        description: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>>;

    /// Mark a pending row failed. Returns false when it was not pending.
    async fn mark_failed(&self, transaction_id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Transaction>>;

    async fn list(&self, filter: &TransactionFilter) -> AppResult<(Vec<TransactionSummary>, i64)>;

    /// Ledger rows created inside the activity window, newest first
    async fn created_since(&self, filter: &ActivityFilter) -> AppResult<Vec<TransactionSummary>>;

    /// Completed deposit and charge totals; `charges_today` counts charges
    /// from `day_start` on.
    async fn totals(&self, day_start: DateTime<Utc>) -> AppResult<LedgerTotals>;

    /// Completed deposits and charges per UTC day from `since`, days with
    /// no rows omitted
    async fn daily_totals(&self, since: DateTime<Utc>) -> AppResult<Vec<DailyLedger>>;
}

pub struct PgTransactionRepository {
    pool: Arc<DbPool>,
}

impl PgTransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn create_pending_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Transaction> {
        let pool = self.pool.as_ref();
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, user_id, amount, balance_after, description, status, payment_id, created_at, updated_at)
            VALUES ($1, $2, $3, 0, 'Deposit - pending', 'pending', $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(payment_id)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(transaction)
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> AppResult<Option<Transaction>> {
        let pool = self.pool.as_ref();
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE payment_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

        Ok(transaction)
    }

    async fn find_for_user_by_payment_id(
        &self,
        user_id: Uuid,
        payment_id: &str,
    ) -> AppResult<Option<Transaction>> {
        let pool = self.pool.as_ref();
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1 AND payment_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

        Ok(transaction)
    }

    async fn complete_deposit(
        &self,
        transaction_id: Uuid,
        credited: Decimal,
        description: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 AND status <> 'completed' FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(open) = open else {
            tx.rollback().await?;
            return Ok(None);
        };

        let balance: Decimal = sqlx::query_scalar(
            r#"
            UPDATE users SET balance = balance + $2, updated_at = $3
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(open.user_id)
        .bind(credited)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let completed = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'completed', amount = $2, balance_after = $3, description = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(credited)
        .bind(balance)
        .bind(description)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(completed))
    }

    async fn mark_failed(&self, transaction_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'failed', description = 'Deposit - failed', updated_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(transaction_id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Transaction>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list(&self, filter: &TransactionFilter) -> AppResult<(Vec<TransactionSummary>, i64)> {
        let pool = self.pool.as_ref();
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, TransactionSummary>(
            r#"
            SELECT t.id, t.user_id, u.email, u.name, t.amount, t.balance_after, t.description,
                   t.status, t.payment_id, t.created_at
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            WHERE ($1::text IS NULL OR t.status = $1)
            ORDER BY t.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((rows, total))
    }

    async fn created_since(&self, filter: &ActivityFilter) -> AppResult<Vec<TransactionSummary>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, TransactionSummary>(
            r#"
            SELECT t.id, t.user_id, u.email, u.name, t.amount, t.balance_after, t.description,
                   t.status, t.payment_id, t.created_at
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            WHERE t.created_at >= $1
              AND ($2::text IS NULL OR u.email ILIKE $2 OR u.name ILIKE $2)
            ORDER BY t.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.since)
        .bind(filter.pattern())
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn totals(&self, day_start: DateTime<Utc>) -> AppResult<LedgerTotals> {
        let pool = self.pool.as_ref();
        let totals = sqlx::query_as::<_, LedgerTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE amount > 0), 0) AS deposit_total,
                COUNT(*) FILTER (WHERE amount > 0) AS deposit_count,
                COALESCE(-SUM(amount) FILTER (WHERE amount < 0), 0) AS charge_total,
                COUNT(*) FILTER (WHERE amount < 0) AS charge_count,
                COUNT(*) FILTER (WHERE amount < 0 AND created_at >= $1) AS charges_today
            FROM transactions
            WHERE status = 'completed'
            "#,
        )
        .bind(day_start)
        .fetch_one(pool)
        .await?;

        Ok(totals)
    }

    async fn daily_totals(&self, since: DateTime<Utc>) -> AppResult<Vec<DailyLedger>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, DailyLedger>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COALESCE(SUM(amount) FILTER (WHERE amount > 0), 0) AS income,
                   COUNT(*) FILTER (WHERE amount < 0) AS operations
            FROM transactions
            WHERE status = 'completed' AND created_at >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
