//! # keychain-core
//!
//! Account/service keyed credential storage over the platform keychain:
//! - Passwords, structured property lists and raw data in one record slot
//! - Accessibility policy attached at write time
//! - OS keychain backend with an in-memory fallback
//! - Uniform error type carrying the platform status code

pub mod accessibility;
pub mod error;
pub mod password;
pub mod settings;
pub mod store;
mod keychain;

#[cfg(test)]
mod test_utils;

pub use accessibility::{Accessibility, ParseAccessibilityError};
pub use error::{Result, StoreError, ERROR_DOMAIN, LOGIC_ERROR_CODE};
pub use keychain::{Keychain, PropertyList};
pub use password::Password;
pub use settings::{Backend, Settings, SettingsError};
pub use store::{KeyringStore, LockState, MemoryStore, PlatformStore, Status};
