//! Error types for keychain-core

use thiserror::Error;

use crate::store::Status;

/// Result type alias for keychain operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error domain attached to every [`StoreError`]
pub const ERROR_DOMAIN: &str = "keychain-core.store";

/// Code reported for failures raised by this crate rather than the platform
pub const LOGIC_ERROR_CODE: i32 = -1;

/// Keychain error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No keychain record for account '{account}' in service '{service}'")]
    NotFound { account: String, service: String },

    #[error("Access denied: {message} (status {code})")]
    AccessDenied { code: i32, message: String },

    #[error("Serialization error: {0}")]
    SerializationFailure(String),

    #[error("Keychain error: {message} (status {code})")]
    StoreFailure { code: i32, message: String },
}

impl StoreError {
    /// Map a platform status for the record at (account, service)
    pub(crate) fn from_status(status: Status, account: &str, service: &str) -> Self {
        if status.is_not_found() {
            Self::NotFound {
                account: account.to_string(),
                service: service.to_string(),
            }
        } else if status.is_access_denied() {
            Self::AccessDenied {
                code: status.code(),
                message: status.message(),
            }
        } else {
            Self::StoreFailure {
                code: status.code(),
                message: status.message(),
            }
        }
    }

    /// Error domain identifier
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }

    /// Numeric code, passed through from the platform when available
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => Status::ITEM_NOT_FOUND,
            Self::AccessDenied { code, .. } | Self::StoreFailure { code, .. } => *code,
            Self::SerializationFailure(_) => LOGIC_ERROR_CODE,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationFailure(e.to_string())
    }
}
