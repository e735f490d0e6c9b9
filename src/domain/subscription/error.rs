use super::state::TransitionError;
use crate::error::AppError;
use crate::infrastructure::payments::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("payment provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<TransitionError> for SubscriptionServiceError {
    fn from(err: TransitionError) -> Self {
        SubscriptionServiceError::Invalid(err.to_string())
    }
}

impl From<PaymentError> for SubscriptionServiceError {
    fn from(err: PaymentError) -> Self {
        SubscriptionServiceError::Provider(err.to_string())
    }
}

impl From<AppError> for SubscriptionServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => SubscriptionServiceError::Invalid(msg),
            AppError::ExternalService(msg) => SubscriptionServiceError::Provider(msg),
            _ => SubscriptionServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<SubscriptionServiceError> for AppError {
    fn from(err: SubscriptionServiceError) -> Self {
        match err {
            SubscriptionServiceError::Invalid(msg) => AppError::BadRequest(msg),
            SubscriptionServiceError::Provider(msg) => AppError::ExternalService(msg),
            SubscriptionServiceError::Dependency(msg) => AppError::Internal(msg),
            SubscriptionServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
