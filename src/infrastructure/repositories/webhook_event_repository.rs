use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Provider webhook as stored in the audit log
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub raw_data: serde_json::Value,
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn is_recorded(&self, event_id: &str) -> AppResult<bool>;

    /// Store the event. Returns false when the event id was already recorded.
    async fn insert_if_new(&self, event: &NewWebhookEvent, now: DateTime<Utc>) -> AppResult<bool>;
}

pub struct PgWebhookEventRepository {
    pool: Arc<DbPool>,
}

impl PgWebhookEventRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PgWebhookEventRepository {
    async fn is_recorded(&self, event_id: &str) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let recorded: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payment_webhook_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(pool)
        .await?;

        Ok(recorded)
    }

    async fn insert_if_new(&self, event: &NewWebhookEvent, now: DateTime<Utc>) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            INSERT INTO payment_webhook_events (id, event_id, event_type, resource_type, resource_id, raw_data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(event.resource_type.as_deref())
        .bind(event.resource_id.as_deref())
        .bind(&event.raw_data)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
