use thiserror::Error;

/// Coarse failure class a transport layer maps onto its status codes.
///
/// Core crates never talk HTTP or gRPC directly; they surface one of these
/// classes and let the edge decide the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => ErrorClass::Validation,
            AppError::NotFound(_) => ErrorClass::NotFound,
            AppError::Unauthorized(_) => ErrorClass::Unauthorized,
            AppError::Forbidden(_) => ErrorClass::Forbidden,
            AppError::Conflict(_) => ErrorClass::Conflict,
            AppError::InternalError(_) | AppError::ConfigError(_) => ErrorClass::Internal,
        }
    }

    /// Message safe to hand to a caller. Internal causes are masked.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(err) => err.to_string(),
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthorized(err)
            | AppError::Forbidden(err)
            | AppError::Conflict(err) => err.to_string(),
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}
