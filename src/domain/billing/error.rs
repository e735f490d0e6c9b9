use crate::error::AppError;
use crate::infrastructure::payments::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum BillingServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payment required: {0}")]
    PaymentRequired(String),
    #[error("payment provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<PaymentError> for BillingServiceError {
    fn from(err: PaymentError) -> Self {
        BillingServiceError::Provider(err.to_string())
    }
}

impl From<AppError> for BillingServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => BillingServiceError::Invalid(msg),
            AppError::NotFound(msg) => BillingServiceError::NotFound(msg),
            AppError::PaymentRequired(msg) => BillingServiceError::PaymentRequired(msg),
            AppError::ExternalService(msg) => BillingServiceError::Provider(msg),
            _ => BillingServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<BillingServiceError> for AppError {
    fn from(err: BillingServiceError) -> Self {
        match err {
            BillingServiceError::Invalid(msg) => AppError::BadRequest(msg),
            BillingServiceError::NotFound(msg) => AppError::NotFound(msg),
            BillingServiceError::PaymentRequired(msg) => AppError::PaymentRequired(msg),
            BillingServiceError::Provider(msg) => AppError::ExternalService(msg),
            BillingServiceError::Dependency(msg) => AppError::Internal(msg),
            BillingServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
