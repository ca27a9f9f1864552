//! Service-level error taxonomy.
//!
//! Login and refresh failures deliberately collapse into two generic
//! variants so responses cannot be used to enumerate tenants, usernames, or
//! live sessions. The conversion to [`AppError`] is where a transport layer
//! picks up status classes.

use anyhow::anyhow;
use service_core::error::AppError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Wrong tenant, unknown user, wrong password, or disabled account.
    /// One message for all of them.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Unknown, expired, revoked, or already-spent refresh token, or a
    /// subject that can no longer refresh. One message for all of them.
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Permission not found")]
    PermissionNotFound,

    #[error("Menu not found")]
    MenuNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store operation timed out")]
    StoreTimeout,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow!("Invalid credentials"))
            }
            ServiceError::InvalidRefreshToken => {
                AppError::Unauthorized(anyhow!("Invalid or expired refresh token"))
            }
            ServiceError::TenantNotFound => AppError::NotFound(anyhow!("Tenant not found")),
            ServiceError::UserNotFound => AppError::NotFound(anyhow!("User not found")),
            ServiceError::RoleNotFound => AppError::NotFound(anyhow!("Role not found")),
            ServiceError::PermissionNotFound => {
                AppError::NotFound(anyhow!("Permission not found"))
            }
            ServiceError::MenuNotFound => AppError::NotFound(anyhow!("Menu not found")),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow!(msg)),
            ServiceError::InvalidRequest(errors) => AppError::ValidationError(errors),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow!(msg)),
            ServiceError::StoreTimeout => {
                AppError::InternalError(anyhow!("Store operation timed out"))
            }
            ServiceError::Store(err) => AppError::InternalError(anyhow::Error::new(err)),
            ServiceError::Token(err) => AppError::InternalError(anyhow::Error::new(err)),
            ServiceError::Internal(err) => AppError::InternalError(err),
        }
    }
}
