use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::domain::user::UserRole;
use crate::infrastructure::config::Config;
use crate::{
    domain::auth::JwtManager, error::AppError, infrastructure::repositories::UserRepository,
};
use uuid::Uuid;

pub const X_CRON_SECRET: &str = "x-cron-secret";

/// User context injected into request extensions after authentication
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Authentication middleware
pub async fn auth_middleware(
    State((user_repo, config)): State<(Arc<dyn UserRepository>, Arc<Config>)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !request.headers().contains_key("authorization") {
        return Err(AppError::Unauthorized(
            "Missing authorization header".to_string(),
        ));
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

    let jwt_manager = JwtManager::new(config.jwt_secret.clone());
    let user_id = jwt_manager.user_id(token)?;

    // Tokens outlive deleted accounts, so the user must still exist
    let user = user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Admin gate. Must run after `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if !user.is_admin() {
        tracing::warn!(user_id = %user.user_id, "Non-admin access to admin route");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

/// Shared-secret gate for the scheduler. Accepts `x-cron-secret` or a
/// bearer token carrying the secret.
pub async fn cron_secret_middleware(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(X_CRON_SECRET)
        .and_then(|v| v.to_str().ok())
        .or_else(|| bearer_token(request.headers()));

    if !secret_matches(provided, &config.cron_secret) {
        tracing::warn!("Cron request with invalid secret");
        return Err(AppError::Unauthorized("Invalid cron secret".to_string()));
    }

    Ok(next.run(request).await)
}

fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(provided) if !expected.is_empty() => {
            bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
        }
        _ => false,
    }
}
