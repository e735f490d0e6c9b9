use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    domain::billing::{
        BalanceResponse, BillingServiceApi, DepositRequest, DepositResponse, VerifyDepositRequest,
        VerifyDepositResponse,
    },
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct BillingController {
    billing_service: Arc<dyn BillingServiceApi>,
}

impl BillingController {
    pub fn new(billing_service: Arc<dyn BillingServiceApi>) -> Self {
        Self { billing_service }
    }

    /// GET /api/user/balance
    pub async fn get_balance(
        State(controller): State<Arc<BillingController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<BalanceResponse>> {
        let response = controller.billing_service.get_balance(auth_user.user_id).await?;
        Ok(Json(response))
    }

    /// POST /api/user/deposit - Open a PayPal order for a top-up
    pub async fn create_deposit(
        State(controller): State<Arc<BillingController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<DepositRequest>, JsonRejection>,
    ) -> AppResult<Json<DepositResponse>> {
        let Json(request) = payload?;
        let response = controller
            .billing_service
            .create_deposit(auth_user.user_id, &request.amount)
            .await?;
        Ok(Json(response))
    }

    /// POST /api/user/deposit/verify - Capture an approved order
    pub async fn verify_deposit(
        State(controller): State<Arc<BillingController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<VerifyDepositRequest>, JsonRejection>,
    ) -> AppResult<Json<VerifyDepositResponse>> {
        let Json(request) = payload?;
        let response = controller
            .billing_service
            .verify_deposit(auth_user.user_id, &request.order_id)
            .await?;
        Ok(Json(response))
    }
}
