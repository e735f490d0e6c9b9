use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum JobsServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl From<AppError> for JobsServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => JobsServiceError::Invalid(msg),
            _ => JobsServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<JobsServiceError> for AppError {
    fn from(err: JobsServiceError) -> Self {
        match err {
            JobsServiceError::Invalid(msg) => AppError::BadRequest(msg),
            JobsServiceError::Dependency(msg) => AppError::Internal(msg),
        }
    }
}
