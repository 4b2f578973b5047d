use thiserror::Error;

/// Errors produced by the ledger.
///
/// `BadRequest` carries a message meant for the user who issued the command.
/// `InvalidArgument` and `InvalidState` mean a caller broke an internal
/// invariant and should be treated as a fault, not shown to the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    /// Returns true if the error should be shown to the user as-is.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, AppError::BadRequest(_))
    }

    /// Returns true if the error points at a broken invariant.
    pub fn is_defect(&self) -> bool {
        matches!(self, AppError::InvalidArgument(_) | AppError::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
