use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum WebhookServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("payment provider error: {0}")]
    Provider(String),
}

impl From<AppError> for WebhookServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => WebhookServiceError::Invalid(msg),
            AppError::Unauthorized(msg) => WebhookServiceError::Unauthorized(msg),
            AppError::ExternalService(msg) => WebhookServiceError::Provider(msg),
            _ => WebhookServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<WebhookServiceError> for AppError {
    fn from(err: WebhookServiceError) -> Self {
        match err {
            WebhookServiceError::Invalid(msg) => AppError::BadRequest(msg),
            WebhookServiceError::Unauthorized(msg) => AppError::Unauthorized(msg),
            WebhookServiceError::Provider(msg) => AppError::ExternalService(msg),
            WebhookServiceError::Dependency(msg) => AppError::Internal(msg),
        }
    }
}
