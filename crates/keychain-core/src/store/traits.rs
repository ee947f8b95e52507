//! Platform store trait definitions

use super::Status;
use crate::accessibility::Accessibility;

/// Result of a single platform primitive
pub type StatusResult<T> = std::result::Result<T, Status>;

/// Query selecting records of one service, optionally narrowed to one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub service: String,
    pub account: Option<String>,
    /// Whether matches should carry the secret bytes
    pub return_data: bool,
}

impl ItemQuery {
    /// Match every account of a service, attributes only
    pub fn service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            account: None,
            return_data: false,
        }
    }

    /// Match a single (account, service) record
    pub fn record(account: &str, service: &str) -> Self {
        Self {
            service: service.to_string(),
            account: Some(account.to_string()),
            return_data: false,
        }
    }

    /// Request the secret bytes with each match
    pub fn with_data(mut self) -> Self {
        self.return_data = true;
        self
    }
}

/// Attributes of a record to be added
#[derive(Clone, PartialEq, Eq)]
pub struct NewItem {
    pub service: String,
    pub account: String,
    pub secret: Vec<u8>,
    pub accessibility: Accessibility,
}

impl std::fmt::Debug for NewItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewItem")
            .field("service", &self.service)
            .field("account", &self.account)
            .field("secret", &"[REDACTED]")
            .field("accessibility", &self.accessibility)
            .finish()
    }
}

/// A record matched by [`PlatformStore::find`]
#[derive(Clone, PartialEq, Eq)]
pub struct ItemMatch {
    pub account: String,
    /// Present only when the query asked for data
    pub secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for ItemMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemMatch")
            .field("account", &self.account)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Capability set of a platform credential store
///
/// Implementations own persistence, access control and the serialization of
/// concurrent writes. Every call is a single synchronous round trip.
pub trait PlatformStore: Send + Sync {
    /// Find matching records, in store order
    ///
    /// Fails with the item-not-found status when nothing matches.
    fn find(&self, query: &ItemQuery) -> StatusResult<Vec<ItemMatch>>;

    /// Add a record; fails with duplicate-item when the key is taken
    fn add(&self, item: &NewItem) -> StatusResult<()>;

    /// Replace the secret of an existing record
    ///
    /// Fails with item-not-found when no record matches.
    fn update(
        &self,
        query: &ItemQuery,
        secret: &[u8],
        accessibility: Accessibility,
    ) -> StatusResult<()>;

    /// Delete matching records, returning how many were removed
    ///
    /// Fails with item-not-found when nothing matches.
    fn delete(&self, query: &ItemQuery) -> StatusResult<usize>;

    /// Check if this store is backed by OS-level protection
    fn is_hardware_backed(&self) -> bool;

    /// Get a human-readable name for this store
    fn backend_name(&self) -> &'static str;
}
