use crate::infrastructure::db::DbPool;
use crate::{domain::user::User, error::AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Zero the free-operation counter of every user whose reset date passed
    /// and schedule their next reset. Returns the number of users reset.
    async fn reset_free_operations(
        &self,
        now: DateTime<Utc>,
        next_reset: DateTime<Utc>,
    ) -> AppResult<u64>;
}

pub struct PgUserRepository {
    pool: Arc<DbPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let pool = self.pool.as_ref();
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    async fn reset_free_operations(
        &self,
        now: DateTime<Utc>,
        next_reset: DateTime<Utc>,
    ) -> AppResult<u64> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET free_operations_used = 0, free_operations_reset = $2, updated_at = $1
            WHERE free_operations_reset < $1
            "#,
        )
        .bind(now)
        .bind(next_reset)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
