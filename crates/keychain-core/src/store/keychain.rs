//! OS keychain platform store
//!
//! Uses the system keychain through the `keyring` crate:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::traits::{ItemMatch, ItemQuery, NewItem, PlatformStore, StatusResult};
use super::{validate_account, validate_query, Status};
use crate::accessibility::Accessibility;

/// Default account holding the per-service account index
pub const DEFAULT_INDEX_ACCOUNT: &str = "__keychain_core_accounts__";

/// Service used to probe keychain availability
const PROBE_SERVICE: &str = "keychain-core";

/// OS keychain platform store
///
/// The keyring API cannot enumerate entries, so each service keeps an index
/// of its accounts under a reserved account name. An account is indexed
/// before its secret is written and unindexed if that write fails.
///
/// Index updates are serialized within this store only. Writers in other
/// processes can still race and drop an index entry; the next update of
/// that account puts it back.
pub struct KeyringStore {
    /// Reserved account holding the index
    index_account: String,
    /// Held across every index read-modify-write
    index_lock: Mutex<()>,
    /// Whether keychain is available
    available: bool,
}

impl KeyringStore {
    /// Create a keyring store with the default index account
    pub fn new() -> Self {
        Self::with_index_account(DEFAULT_INDEX_ACCOUNT)
    }

    /// Create a keyring store with a custom index account
    pub fn with_index_account(index_account: &str) -> Self {
        let available = Self::test_availability();

        if available {
            debug!("Keychain storage is available");
        } else {
            warn!("Keychain storage is not available - operations will fail");
        }

        Self {
            index_account: index_account.to_string(),
            index_lock: Mutex::new(()),
            available,
        }
    }

    /// Test if the keychain is available
    fn test_availability() -> bool {
        match Entry::new(PROBE_SERVICE, "__test_availability__") {
            Ok(entry) => {
                if entry.set_password("test").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    /// Check if keychain is available
    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure_available(&self) -> StatusResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(Status::with_message(Status::NOT_AVAILABLE, "Keychain not available"))
        }
    }

    /// Reject caller accounts that collide with the index entry
    fn check_account(&self, account: &str) -> StatusResult<()> {
        validate_account(account)?;
        if account == self.index_account {
            return Err(Status::param(format!("Account name '{}' is reserved", account)));
        }
        Ok(())
    }

    fn entry(&self, service: &str, account: &str) -> StatusResult<Entry> {
        Entry::new(service, account).map_err(status_from_keyring)
    }

    fn read_secret(&self, service: &str, account: &str) -> StatusResult<Vec<u8>> {
        let encoded = self
            .entry(service, account)?
            .get_password()
            .map_err(status_from_keyring)?;
        base64_decode(&encoded)
    }

    fn write_secret(&self, service: &str, account: &str, secret: &[u8]) -> StatusResult<()> {
        self.entry(service, account)?
            .set_password(&base64_encode(secret))
            .map_err(status_from_keyring)
    }

    fn exists(&self, service: &str, account: &str) -> StatusResult<bool> {
        match self.entry(service, account)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(status_from_keyring(e)),
        }
    }

    fn lock_index(&self) -> MutexGuard<'_, ()> {
        self.index_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accounts recorded in the service index, in insertion order
    fn read_index(&self, service: &str) -> StatusResult<Vec<String>> {
        match self.entry(service, &self.index_account)?.get_password() {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                Status::with_message(Status::DECODE, format!("Corrupt account index: {}", e))
            }),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(status_from_keyring(e)),
        }
    }

    fn write_index(&self, service: &str, accounts: &[String]) -> StatusResult<()> {
        let entry = self.entry(service, &self.index_account)?;

        if accounts.is_empty() {
            return match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(status_from_keyring(e)),
            };
        }

        let json = serde_json::to_string(accounts)
            .map_err(|e| Status::with_message(Status::PARAM, e.to_string()))?;
        entry.set_password(&json).map_err(status_from_keyring)
    }

    /// Add an account to the service index, returning whether it was missing
    fn index_insert(&self, service: &str, account: &str) -> StatusResult<bool> {
        let _guard = self.lock_index();

        let mut accounts = self.read_index(service)?;
        if accounts.iter().any(|a| a == account) {
            return Ok(false);
        }

        accounts.push(account.to_string());
        self.write_index(service, &accounts)?;
        Ok(true)
    }

    /// Drop accounts from the service index
    fn index_remove(&self, service: &str, targets: &[String]) -> StatusResult<()> {
        let _guard = self.lock_index();

        let accounts = self.read_index(service)?;
        let remaining: Vec<String> = accounts
            .iter()
            .filter(|a| !targets.contains(a))
            .cloned()
            .collect();

        if remaining.len() != accounts.len() {
            self.write_index(service, &remaining)?;
        }
        Ok(())
    }

    /// Accounts a query applies to
    fn target_accounts(&self, query: &ItemQuery) -> StatusResult<Vec<String>> {
        match &query.account {
            Some(account) => {
                self.check_account(account)?;
                Ok(vec![account.clone()])
            }
            None => self.read_index(&query.service),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformStore for KeyringStore {
    fn find(&self, query: &ItemQuery) -> StatusResult<Vec<ItemMatch>> {
        self.ensure_available()?;
        validate_query(query)?;

        let mut found = Vec::new();
        for account in self.target_accounts(query)? {
            // The keyring has no attribute-only lookup, so both paths read the entry
            match self.read_secret(&query.service, &account) {
                Ok(secret) => found.push(ItemMatch {
                    account,
                    secret: query.return_data.then_some(secret),
                }),
                Err(status) if status.is_not_found() => {
                    // Index entries may outlive records removed by other tools
                    debug!("Skipping stale index entry: {}/{}", query.service, account);
                }
                Err(status) => return Err(status),
            }
        }

        debug!("Found {} keychain entries for {}", found.len(), query.service);

        if found.is_empty() {
            return Err(Status::item_not_found());
        }
        Ok(found)
    }

    fn add(&self, item: &NewItem) -> StatusResult<()> {
        self.ensure_available()?;
        validate_query(&ItemQuery::service(&item.service))?;
        self.check_account(&item.account)?;

        if self.exists(&item.service, &item.account)? {
            return Err(Status::duplicate_item());
        }

        log_accessibility(item.accessibility);
        let indexed = self.index_insert(&item.service, &item.account)?;

        if let Err(status) = self.write_secret(&item.service, &item.account, &item.secret) {
            if indexed {
                if let Err(e) = self.index_remove(&item.service, &[item.account.clone()]) {
                    warn!(
                        "Failed to unindex {}/{} after write error: {}",
                        item.service, item.account, e
                    );
                }
            }
            return Err(status);
        }

        debug!("Added keychain entry: {}/{}", item.service, item.account);
        Ok(())
    }

    fn update(
        &self,
        query: &ItemQuery,
        secret: &[u8],
        accessibility: Accessibility,
    ) -> StatusResult<()> {
        self.ensure_available()?;
        validate_query(query)?;

        let mut updated = 0;
        for account in self.target_accounts(query)? {
            if self.exists(&query.service, &account)? {
                log_accessibility(accessibility);
                self.write_secret(&query.service, &account, secret)?;
                if query.account.is_some() && self.index_insert(&query.service, &account)? {
                    debug!("Restored index entry: {}/{}", query.service, account);
                }
                updated += 1;
            }
        }

        if updated == 0 {
            return Err(Status::item_not_found());
        }

        debug!("Updated {} keychain entries for {}", updated, query.service);
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> StatusResult<usize> {
        self.ensure_available()?;
        validate_query(query)?;

        let targets = self.target_accounts(query)?;
        let mut removed = 0;
        for account in &targets {
            match self.entry(&query.service, account)?.delete_password() {
                Ok(()) => removed += 1,
                Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(status_from_keyring(e)),
            }
        }

        self.index_remove(&query.service, &targets)?;

        if removed == 0 {
            return Err(Status::item_not_found());
        }

        debug!("Deleted {} keychain entries for {}", removed, query.service);
        Ok(removed)
    }

    fn is_hardware_backed(&self) -> bool {
        // OS keychains use OS-level protection (Secure Enclave, DPAPI, ...)
        self.available
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}

/// The keyring API has no accessibility attribute; the OS default applies
fn log_accessibility(accessibility: Accessibility) {
    debug!(
        "Accessibility '{}' is governed by the OS keychain defaults",
        accessibility
    );
}

/// Map a keyring error to a platform status
fn status_from_keyring(e: keyring::Error) -> Status {
    match e {
        keyring::Error::NoEntry => Status::item_not_found(),
        keyring::Error::NoStorageAccess(inner) => {
            Status::with_message(Status::AUTH_FAILED, inner.to_string())
        }
        keyring::Error::BadEncoding(_) => {
            Status::with_message(Status::DECODE, "Keychain entry is not valid UTF-8")
        }
        e @ (keyring::Error::TooLong(..) | keyring::Error::Invalid(..)) => {
            Status::param(e.to_string())
        }
        other => Status::with_message(Status::NOT_AVAILABLE, other.to_string()),
    }
}

/// Base64 encode bytes
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 decode string
fn base64_decode(encoded: &str) -> StatusResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Status::with_message(Status::DECODE, format!("Base64 decode error: {}", e)))
}
