use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::infrastructure::db::{schema_version, DbPool};

/// GET /health - Liveness, never touches the database
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /health/ready - Ready once the database answers and the billing
/// schema has been migrated
pub async fn health_ready(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    match schema_version(&pool).await {
        Ok(Some(version)) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "connected",
                "schemaVersion": version
            })),
        ),
        Ok(None) => {
            tracing::warn!("Readiness check: no migrations applied");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "database": "unmigrated"
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "database": "disconnected"
                })),
            )
        }
    }
}
