use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    domain::subscription::{
        SubscriptionRequest, SubscriptionResponse, SubscriptionServiceApi, VerifySubscriptionQuery,
    },
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct SubscriptionController {
    subscription_service: Arc<dyn SubscriptionServiceApi>,
}

impl SubscriptionController {
    pub fn new(subscription_service: Arc<dyn SubscriptionServiceApi>) -> Self {
        Self {
            subscription_service,
        }
    }

    /// GET /api/subscription - Current subscription, created as free on first access
    pub async fn get_subscription(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let response = controller
            .subscription_service
            .get_subscription(auth_user.user_id)
            .await?;
        Ok(Json(response))
    }

    /// POST /api/subscription - Start a checkout, or switch to free
    pub async fn create_subscription(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<SubscriptionRequest>, JsonRejection>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let Json(request) = payload?;
        let response = controller
            .subscription_service
            .create_subscription(auth_user.user_id, &request.tier)
            .await?;
        Ok(Json(response))
    }

    /// POST /api/subscription/upgrade
    pub async fn upgrade(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<SubscriptionRequest>, JsonRejection>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let Json(request) = payload?;
        let response = controller
            .subscription_service
            .upgrade(auth_user.user_id, &request.tier)
            .await?;
        Ok(Json(response))
    }

    /// GET /api/subscription/verify?subscription_id= - Return leg of the PayPal checkout
    pub async fn verify(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
        query: Result<Query<VerifySubscriptionQuery>, QueryRejection>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let Query(query) = query?;
        let response = controller
            .subscription_service
            .verify(auth_user.user_id, query.subscription_id.as_deref())
            .await?;
        Ok(Json(response))
    }

    /// POST /api/subscription/cancel
    pub async fn cancel(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let response = controller
            .subscription_service
            .cancel(auth_user.user_id)
            .await?;
        Ok(Json(response))
    }

    /// POST /api/subscription/reset-pending - Abandon a stuck checkout
    pub async fn reset_pending(
        State(controller): State<Arc<SubscriptionController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<SubscriptionResponse>> {
        let response = controller
            .subscription_service
            .reset_pending(auth_user.user_id)
            .await?;
        Ok(Json(response))
    }
}
