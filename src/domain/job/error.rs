use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("text too large: {0}")]
    PayloadTooLarge(String),
    #[error("artifact not available: {0}")]
    NotReady(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<JobServiceError> for AppError {
    fn from(err: JobServiceError) -> Self {
        match err {
            JobServiceError::NotFound(msg) => AppError::NotFound(msg),
            JobServiceError::Invalid(msg) => AppError::BadRequest(msg),
            JobServiceError::PayloadTooLarge(msg) => AppError::PayloadTooLarge(msg),
            JobServiceError::NotReady(msg) => AppError::Conflict(msg),
            JobServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
