use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Water was replaced less than an hour ago")]
    RateLimited,

    #[error("Periodic task not found")]
    PeriodicTaskNotFound,

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl TaskError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaskError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            TaskError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            TaskError::PeriodicTaskNotFound => StatusCode::BAD_REQUEST,
            TaskError::InvalidTime(_) => StatusCode::BAD_REQUEST,
            TaskError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
