use sea_orm::DbErr;

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the engines. All of them are recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid or expired attendance code")]
    InvalidOrExpired,

    #[error("Attendance already submitted for this session")]
    AlreadySubmitted,

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Storage(#[from] DbErr),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(common::format_validation_errors(&errors))
    }
}
