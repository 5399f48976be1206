use thiserror::Error;

use crate::store::StoreError;

/// Result alias used by every service operation.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy for the inventory core.
///
/// Validation and business-rule failures are detected before any mutation;
/// infrastructure failures are wrapped in [`StoreError`] with the operation
/// and key that failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Bounded wait on a contended balance row expired. Retryable.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        Self::BusinessRule(msg.into())
    }

    /// True for errors a caller may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}
