//! Platform status codes
//!
//! Every primitive of a [`PlatformStore`](super::PlatformStore) reports
//! failure as a [`Status`]. Codes follow the Security framework numbering so
//! they can be passed through to callers unchanged.

use std::fmt;

/// Status code reported by a platform store primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: i32,
    message: Option<String>,
}

impl Status {
    pub const SUCCESS: i32 = 0;
    pub const UNIMPLEMENTED: i32 = -4;
    pub const PARAM: i32 = -50;
    pub const NOT_AVAILABLE: i32 = -25291;
    pub const AUTH_FAILED: i32 = -25293;
    pub const DUPLICATE_ITEM: i32 = -25299;
    pub const ITEM_NOT_FOUND: i32 = -25300;
    pub const INTERACTION_NOT_ALLOWED: i32 = -25308;
    pub const DECODE: i32 = -26275;

    /// Create a status with the default message for its code
    pub fn new(code: i32) -> Self {
        Self { code, message: None }
    }

    /// Create a status with a backend-specific message
    pub fn with_message(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn item_not_found() -> Self {
        Self::new(Self::ITEM_NOT_FOUND)
    }

    pub fn duplicate_item() -> Self {
        Self::new(Self::DUPLICATE_ITEM)
    }

    pub fn param(message: impl Into<String>) -> Self {
        Self::with_message(Self::PARAM, message)
    }

    /// Numeric status code
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Whether this status means "no matching item"
    pub fn is_not_found(&self) -> bool {
        self.code == Self::ITEM_NOT_FOUND
    }

    /// Whether the platform refused the operation on policy grounds
    pub fn is_access_denied(&self) -> bool {
        matches!(self.code, Self::AUTH_FAILED | Self::INTERACTION_NOT_ALLOWED)
    }

    /// Human-readable description, preferring the backend message
    pub fn message(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => describe(self.code).to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message(), self.code)
    }
}

fn describe(code: i32) -> &'static str {
    match code {
        Status::SUCCESS => "No error",
        Status::UNIMPLEMENTED => "Function or operation not implemented",
        Status::PARAM => "One or more parameters passed to the function were not valid",
        Status::NOT_AVAILABLE => "No keychain is available",
        Status::AUTH_FAILED => "Authorization/Authentication failed",
        Status::DUPLICATE_ITEM => "The item already exists",
        Status::ITEM_NOT_FOUND => "The item cannot be found",
        Status::INTERACTION_NOT_ALLOWED => "Interaction with the keychain is not allowed",
        Status::DECODE => "Unable to decode the provided data",
        _ => "Unknown keychain status",
    }
}
