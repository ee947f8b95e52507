//! Platform credential stores
//!
//! The facade talks to a [`PlatformStore`]. Two implementations are provided:
//! 1. OS keychain via the `keyring` crate
//! 2. In-memory store (tests, hosts without a keychain)

mod keychain;
mod memory;
mod status;
mod traits;

pub use keychain::{KeyringStore, DEFAULT_INDEX_ACCOUNT};
pub use memory::{LockState, MemoryStore};
pub use status::Status;
pub use traits::{ItemMatch, ItemQuery, NewItem, PlatformStore, StatusResult};

/// Reject an empty service or account before touching the store
pub(crate) fn validate_query(query: &ItemQuery) -> StatusResult<()> {
    if query.service.is_empty() {
        return Err(Status::param("Service must not be empty"));
    }
    match &query.account {
        Some(account) => validate_account(account),
        None => Ok(()),
    }
}

pub(crate) fn validate_account(account: &str) -> StatusResult<()> {
    if account.is_empty() {
        return Err(Status::param("Account must not be empty"));
    }
    Ok(())
}
