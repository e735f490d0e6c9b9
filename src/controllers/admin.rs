use axum::{
    extract::{
        rejection::QueryRejection,
        Query, State,
    },
    Json,
};
use std::sync::Arc;

use crate::{
    domain::admin::{
        ActivityQuery, ActivityResponse, AdminListQuery, AdminServiceApi, SubscriptionListResponse,
        SubscriptionStatsResponse, TransactionListResponse, TransactionStatsResponse,
        UsageReportQuery, UsageReportResponse,
    },
    error::AppResult,
};

pub struct AdminController {
    admin_service: Arc<dyn AdminServiceApi>,
}

impl AdminController {
    pub fn new(admin_service: Arc<dyn AdminServiceApi>) -> Self {
        Self { admin_service }
    }

    /// GET /api/admin/subscriptions
    pub async fn list_subscriptions(
        State(controller): State<Arc<AdminController>>,
        query: Result<Query<AdminListQuery>, QueryRejection>,
    ) -> AppResult<Json<SubscriptionListResponse>> {
        let Query(query) = query?;
        let response = controller.admin_service.list_subscriptions(query).await?;
        Ok(Json(response))
    }

    /// GET /api/admin/transactions
    pub async fn list_transactions(
        State(controller): State<Arc<AdminController>>,
        query: Result<Query<AdminListQuery>, QueryRejection>,
    ) -> AppResult<Json<TransactionListResponse>> {
        let Query(query) = query?;
        let response = controller.admin_service.list_transactions(query).await?;
        Ok(Json(response))
    }

    /// GET /api/admin/usage?days=
    pub async fn usage_report(
        State(controller): State<Arc<AdminController>>,
        query: Result<Query<UsageReportQuery>, QueryRejection>,
    ) -> AppResult<Json<UsageReportResponse>> {
        let Query(query) = query?;
        let response = controller.admin_service.usage_report(query).await?;
        Ok(Json(response))
    }

    /// GET /api/admin/activity?search=&type=&status=&timeRange=
    pub async fn activity(
        State(controller): State<Arc<AdminController>>,
        query: Result<Query<ActivityQuery>, QueryRejection>,
    ) -> AppResult<Json<ActivityResponse>> {
        let Query(query) = query?;
        let response = controller.admin_service.activity(query).await?;
        Ok(Json(response))
    }

    /// GET /api/admin/transactions/stats
    pub async fn transaction_stats(
        State(controller): State<Arc<AdminController>>,
    ) -> AppResult<Json<TransactionStatsResponse>> {
        Ok(Json(controller.admin_service.transaction_stats().await?))
    }

    /// GET /api/admin/subscriptions/stats
    pub async fn subscription_stats(
        State(controller): State<Arc<AdminController>>,
    ) -> AppResult<Json<SubscriptionStatsResponse>> {
        Ok(Json(controller.admin_service.subscription_stats().await?))
    }
}
