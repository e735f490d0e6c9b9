use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    domain::billing::{BillingServiceApi, OperationCheckResponse, OperationRequest, OperationResponse},
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct OperationsController {
    billing_service: Arc<dyn BillingServiceApi>,
}

impl OperationsController {
    pub fn new(billing_service: Arc<dyn BillingServiceApi>) -> Self {
        Self { billing_service }
    }

    /// POST /api/operations/check - Whether the user can pay for one operation
    pub async fn check(
        State(controller): State<Arc<OperationsController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<OperationRequest>, JsonRejection>,
    ) -> AppResult<Json<OperationCheckResponse>> {
        let Json(request) = payload?;
        let response = controller
            .billing_service
            .check_operation(auth_user.user_id, request.operation_type.as_deref())
            .await?;
        Ok(Json(response))
    }

    /// POST /api/operations/process - Charge one operation
    pub async fn process(
        State(controller): State<Arc<OperationsController>>,
        Extension(auth_user): Extension<AuthUser>,
        payload: Result<Json<OperationRequest>, JsonRejection>,
    ) -> AppResult<Json<OperationResponse>> {
        let Json(request) = payload?;
        let response = controller
            .billing_service
            .process_operation(auth_user.user_id, request.operation_type.as_deref())
            .await?;
        Ok(Json(response))
    }
}
