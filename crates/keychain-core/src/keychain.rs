//! Credential store facade
//!
//! [`Keychain`] translates account/service keyed operations into
//! [`PlatformStore`] primitives and maps the resulting status codes to
//! [`StoreError`]. It holds no state besides the store handle and the
//! default accessibility; every read is a round trip to the store.

use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::accessibility::Accessibility;
use crate::error::{Result, StoreError};
use crate::password::Password;
use crate::settings::{Backend, Settings};
use crate::store::{ItemQuery, KeyringStore, MemoryStore, NewItem, PlatformStore};

/// Default structured value for property list records
///
/// Property lists are stored as JSON bytes, not in the binary plist format.
/// Records written as plists by other applications will fail to decode with
/// [`StoreError::SerializationFailure`].
pub type PropertyList = serde_json::Value;

/// Account/service keyed credential store
#[derive(Clone)]
pub struct Keychain {
    /// Platform store every call is forwarded to
    store: Arc<dyn PlatformStore>,
    /// Applied when a write omits an accessibility policy
    default_accessibility: Accessibility,
}

impl Keychain {
    /// Create a keychain over the given platform store
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self {
            store,
            default_accessibility: Accessibility::default(),
        }
    }

    /// Create a keychain over the OS keychain
    pub fn system() -> Self {
        Self::new(Arc::new(KeyringStore::new()))
    }

    /// Create a keychain from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let store: Arc<dyn PlatformStore> = match settings.backend {
            Backend::Keyring => Arc::new(KeyringStore::with_index_account(
                &settings.keyring_index_account,
            )),
            Backend::Memory => Arc::new(MemoryStore::new()),
        };

        info!(
            "Keychain using {} (default accessibility: {})",
            store.backend_name(),
            settings.default_accessibility
        );

        Self::new(store).with_default_accessibility(settings.default_accessibility)
    }

    /// Set the accessibility applied when a write omits one
    pub fn with_default_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.default_accessibility = accessibility;
        self
    }

    pub fn default_accessibility(&self) -> Accessibility {
        self.default_accessibility
    }

    /// Get a human-readable name for the platform store
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Check if the platform store is hardware-backed
    pub fn is_hardware_backed(&self) -> bool {
        self.store.is_hardware_backed()
    }

    /// List accounts with a record for the service
    ///
    /// Returns an empty list when the service has no records.
    pub fn accounts(&self, service: &str) -> Result<Vec<String>> {
        match self.store.find(&ItemQuery::service(service)) {
            Ok(matches) => {
                let accounts: IndexSet<String> =
                    matches.into_iter().map(|m| m.account).collect();
                debug!("Found {} accounts for service {}", accounts.len(), service);
                Ok(accounts.into_iter().collect())
            }
            Err(status) if status.is_not_found() => {
                debug!("No accounts for service {}", service);
                Ok(Vec::new())
            }
            Err(status) => Err(StoreError::from_status(status, "", service)),
        }
    }

    /// Get the password stored for (account, service)
    pub fn password(&self, account: &str, service: &str) -> Result<Password> {
        let bytes = self.read(account, service)?;
        Password::from_bytes(bytes).map_err(|_| {
            StoreError::SerializationFailure(format!(
                "Password for account '{}' in service '{}' is not valid UTF-8",
                account, service
            ))
        })
    }

    /// Store a password, replacing any record at (account, service)
    pub fn set_password(
        &self,
        account: &str,
        service: &str,
        password: &str,
        accessibility: Option<Accessibility>,
    ) -> Result<()> {
        self.upsert(account, service, password.as_bytes(), accessibility)
    }

    /// Remove the record at (account, service)
    ///
    /// Removing an absent record succeeds.
    pub fn remove(&self, account: &str, service: &str) -> Result<()> {
        match self.store.delete(&ItemQuery::record(account, service)) {
            Ok(_) => {
                info!("Removed keychain record: {}/{}", service, account);
                Ok(())
            }
            Err(status) if status.is_not_found() => {
                debug!("Keychain record already absent: {}/{}", service, account);
                Ok(())
            }
            Err(status) => Err(StoreError::from_status(status, account, service)),
        }
    }

    /// Remove every record of the service, returning how many were removed
    pub fn remove_all(&self, service: &str) -> Result<usize> {
        match self.store.delete(&ItemQuery::service(service)) {
            Ok(removed) => {
                info!("Removed {} keychain records for {}", removed, service);
                Ok(removed)
            }
            Err(status) if status.is_not_found() => Ok(0),
            Err(status) => Err(StoreError::from_status(status, "", service)),
        }
    }

    /// Check if a record exists at (account, service) without reading it
    pub fn contains(&self, account: &str, service: &str) -> Result<bool> {
        match self.store.find(&ItemQuery::record(account, service)) {
            Ok(matches) => Ok(!matches.is_empty()),
            Err(status) if status.is_not_found() => Ok(false),
            Err(status) => Err(StoreError::from_status(status, account, service)),
        }
    }

    /// Get and deserialize the property list stored for (account, service)
    pub fn property_list<T: DeserializeOwned>(&self, account: &str, service: &str) -> Result<T> {
        let bytes = self.read(account, service)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Serialize and store a property list, replacing any record
    pub fn set_property_list<T: Serialize + ?Sized>(
        &self,
        account: &str,
        service: &str,
        value: &T,
        accessibility: Option<Accessibility>,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.upsert(account, service, &bytes, accessibility)
    }

    /// Get the raw bytes stored for (account, service)
    pub fn data(&self, account: &str, service: &str) -> Result<Vec<u8>> {
        self.read(account, service)
    }

    /// Store raw bytes, replacing any record at (account, service)
    pub fn set_data(
        &self,
        account: &str,
        service: &str,
        data: &[u8],
        accessibility: Option<Accessibility>,
    ) -> Result<()> {
        self.upsert(account, service, data, accessibility)
    }

    /// Read the secret bytes of a single record
    fn read(&self, account: &str, service: &str) -> Result<Vec<u8>> {
        let query = ItemQuery::record(account, service).with_data();
        let matches = self
            .store
            .find(&query)
            .map_err(|status| StoreError::from_status(status, account, service))?;

        let secret = matches
            .into_iter()
            .next()
            .and_then(|m| m.secret)
            .ok_or_else(|| StoreError::NotFound {
                account: account.to_string(),
                service: service.to_string(),
            })?;

        debug!("Read keychain record: {}/{}", service, account);
        Ok(secret)
    }

    /// Update the record if present, add it otherwise
    fn upsert(
        &self,
        account: &str,
        service: &str,
        secret: &[u8],
        accessibility: Option<Accessibility>,
    ) -> Result<()> {
        let accessibility = accessibility.unwrap_or(self.default_accessibility);
        let query = ItemQuery::record(account, service);

        match self.store.update(&query, secret, accessibility) {
            Ok(()) => {
                debug!("Updated keychain record: {}/{}", service, account);
                return Ok(());
            }
            Err(status) if status.is_not_found() => {}
            Err(status) => return Err(StoreError::from_status(status, account, service)),
        }

        let item = NewItem {
            service: service.to_string(),
            account: account.to_string(),
            secret: secret.to_vec(),
            accessibility,
        };
        self.store
            .add(&item)
            .map_err(|status| StoreError::from_status(status, account, service))?;

        debug!("Added keychain record: {}/{}", service, account);
        Ok(())
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("backend", &self.store.backend_name())
            .field("default_accessibility", &self.default_accessibility)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ItemMatch, LockState, Status, StatusResult};
    use serde::Deserialize;
    use serde_json::json;

    const SERVICE: &str = "com.example.mail";

    fn test_keychain() -> (Keychain, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Keychain::new(store.clone()), store)
    }

    /// Store whose every primitive fails with a fixed status
    struct FailingStore(i32);

    impl PlatformStore for FailingStore {
        fn find(&self, _query: &ItemQuery) -> StatusResult<Vec<ItemMatch>> {
            Err(Status::new(self.0))
        }

        fn add(&self, _item: &NewItem) -> StatusResult<()> {
            Err(Status::new(self.0))
        }

        fn update(&self, _: &ItemQuery, _: &[u8], _: Accessibility) -> StatusResult<()> {
            Err(Status::new(self.0))
        }

        fn delete(&self, _query: &ItemQuery) -> StatusResult<usize> {
            Err(Status::new(self.0))
        }

        fn is_hardware_backed(&self) -> bool {
            false
        }

        fn backend_name(&self) -> &'static str {
            "Failing Store"
        }
    }

    #[test]
    fn test_password_round_trip() {
        let (keychain, _) = test_keychain();

        keychain.set_password("alice", SERVICE, "hunter2", None).unwrap();

        let password = keychain.password("alice", SERVICE).unwrap();
        assert_eq!(password.expose(), "hunter2");
    }

    #[test]
    fn test_set_password_overwrites() {
        let (keychain, store) = test_keychain();

        keychain.set_password("alice", SERVICE, "first", None).unwrap();
        keychain.set_password("alice", SERVICE, "second", None).unwrap();

        assert_eq!(keychain.password("alice", SERVICE).unwrap().expose(), "second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reads_of_absent_record_fail_not_found() {
        let (keychain, _) = test_keychain();

        assert!(keychain.password("nobody", SERVICE).unwrap_err().is_not_found());
        assert!(keychain.data("nobody", SERVICE).unwrap_err().is_not_found());
        assert!(keychain
            .property_list::<PropertyList>("nobody", SERVICE)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_remove() {
        let (keychain, _) = test_keychain();

        keychain.set_password("alice", SERVICE, "hunter2", None).unwrap();
        keychain.remove("alice", SERVICE).unwrap();

        assert!(keychain.password("alice", SERVICE).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_absent_is_ok() {
        let (keychain, _) = test_keychain();
        keychain.remove("nobody", SERVICE).unwrap();
        keychain.remove("nobody", SERVICE).unwrap();
    }

    #[test]
    fn test_accounts_lists_only_stored_records() {
        let (keychain, _) = test_keychain();

        keychain.set_password("alice", SERVICE, "a", None).unwrap();
        keychain.set_data("bob", SERVICE, b"b", None).unwrap();
        keychain.set_password("alice", SERVICE, "a2", None).unwrap();
        keychain.set_password("carol", "com.example.chat", "c", None).unwrap();
        keychain.set_password("dave", SERVICE, "d", None).unwrap();
        keychain.remove("dave", SERVICE).unwrap();

        let mut accounts = keychain.accounts(SERVICE).unwrap();
        accounts.sort();
        assert_eq!(accounts, vec!["alice", "bob"]);
    }

    #[test]
    fn test_accounts_empty_service() {
        let (keychain, _) = test_keychain();
        assert!(keychain.accounts(SERVICE).unwrap().is_empty());
    }

    #[test]
    fn test_property_list_round_trip() {
        let (keychain, _) = test_keychain();
        let value = json!({
            "servers": ["imap.example.com", "smtp.example.com"],
            "port": 993,
            "tls": true,
            "nested": { "labels": ["work", "home"] }
        });

        keychain.set_property_list("alice", SERVICE, &value, None).unwrap();

        let loaded: PropertyList = keychain.property_list("alice", SERVICE).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_property_list_typed() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            scopes: Vec<String>,
        }

        let (keychain, _) = test_keychain();
        let profile = Profile {
            name: "alice".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
        };

        keychain.set_property_list("alice", SERVICE, &profile, None).unwrap();

        let loaded: Profile = keychain.property_list("alice", SERVICE).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_property_list_decode_failure() {
        let (keychain, _) = test_keychain();
        keychain.set_data("alice", SERVICE, b"\x00\x01 not json", None).unwrap();

        let err = keychain
            .property_list::<PropertyList>("alice", SERVICE)
            .unwrap_err();
        assert!(matches!(err, StoreError::SerializationFailure(_)));
    }

    #[test]
    fn test_data_round_trip_empty_and_large() {
        let (keychain, _) = test_keychain();

        keychain.set_data("empty", SERVICE, &[], None).unwrap();
        assert!(keychain.data("empty", SERVICE).unwrap().is_empty());

        let large: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
        keychain.set_data("large", SERVICE, &large, None).unwrap();
        assert_eq!(keychain.data("large", SERVICE).unwrap(), large);
    }

    #[test]
    fn test_representations_share_a_slot() {
        let (keychain, store) = test_keychain();

        keychain.set_password("alice", SERVICE, "hunter2", None).unwrap();
        keychain.set_data("alice", SERVICE, &[0xff, 0xfe], None).unwrap();

        assert_eq!(keychain.data("alice", SERVICE).unwrap(), vec![0xff, 0xfe]);
        assert!(matches!(
            keychain.password("alice", SERVICE).unwrap_err(),
            StoreError::SerializationFailure(_)
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_contains_and_remove_all() {
        let (keychain, _) = test_keychain();

        assert!(!keychain.contains("alice", SERVICE).unwrap());
        keychain.set_password("alice", SERVICE, "a", None).unwrap();
        keychain.set_password("bob", SERVICE, "b", None).unwrap();
        assert!(keychain.contains("alice", SERVICE).unwrap());

        assert_eq!(keychain.remove_all(SERVICE).unwrap(), 2);
        assert_eq!(keychain.remove_all(SERVICE).unwrap(), 0);
        assert!(keychain.accounts(SERVICE).unwrap().is_empty());
    }

    #[test]
    fn test_locked_store_denies_when_unlocked_records() {
        let (keychain, store) = test_keychain();

        keychain
            .set_password("alice", SERVICE, "a", Some(Accessibility::WhenUnlocked))
            .unwrap();
        keychain
            .set_password("bob", SERVICE, "b", Some(Accessibility::AfterFirstUnlock))
            .unwrap();

        store.set_lock_state(LockState::Locked);

        let err = keychain.password("alice", SERVICE).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
        assert_eq!(err.code(), Status::INTERACTION_NOT_ALLOWED);

        assert_eq!(keychain.password("bob", SERVICE).unwrap().expose(), "b");
        assert!(keychain.contains("alice", SERVICE).unwrap());
    }

    #[test]
    fn test_default_accessibility_applies() {
        let store = Arc::new(MemoryStore::new());
        let keychain =
            Keychain::new(store.clone()).with_default_accessibility(Accessibility::Always);

        keychain.set_password("alice", SERVICE, "a", None).unwrap();
        store.set_lock_state(LockState::BeforeFirstUnlock);

        assert_eq!(keychain.password("alice", SERVICE).unwrap().expose(), "a");
    }

    #[test]
    fn test_store_failures_pass_through() {
        let keychain = Keychain::new(Arc::new(FailingStore(Status::NOT_AVAILABLE)));

        let err = keychain.accounts(SERVICE).unwrap_err();
        assert_eq!(err.code(), Status::NOT_AVAILABLE);
        assert!(matches!(err, StoreError::StoreFailure { .. }));

        assert!(keychain.remove("alice", SERVICE).is_err());
        assert!(keychain.set_password("alice", SERVICE, "a", None).is_err());
    }

    #[test]
    fn test_auth_failure_is_access_denied() {
        let keychain = Keychain::new(Arc::new(FailingStore(Status::AUTH_FAILED)));

        let err = keychain.data("alice", SERVICE).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
    }

    #[test]
    fn test_empty_identifiers_rejected_by_store() {
        let (keychain, _) = test_keychain();

        let err = keychain.set_password("", SERVICE, "a", None).unwrap_err();
        assert_eq!(err.code(), Status::PARAM);
    }

    #[test]
    fn test_from_settings_memory_backend() {
        let settings = Settings {
            backend: Backend::Memory,
            default_accessibility: Accessibility::AfterFirstUnlock,
            ..Settings::default()
        };

        let keychain = Keychain::from_settings(&settings);
        assert_eq!(keychain.backend_name(), "In-Memory Store");
        assert!(!keychain.is_hardware_backed());
        assert_eq!(keychain.default_accessibility(), Accessibility::AfterFirstUnlock);

        keychain.set_password("alice", SERVICE, "a", None).unwrap();
        assert_eq!(keychain.accounts(SERVICE).unwrap(), vec!["alice"]);
    }

    #[test]
    fn test_concurrent_callers() {
        let (keychain, _) = test_keychain();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let keychain = keychain.clone();
                std::thread::spawn(move || {
                    let account = format!("user-{}", i);
                    let password = format!("pw-{}", i);
                    keychain.set_password(&account, SERVICE, &password, None)?;
                    let read = keychain.password(&account, SERVICE)?;
                    assert_eq!(read.expose(), password);
                    Ok::<_, StoreError>(())
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let mut accounts = keychain.accounts(SERVICE).unwrap();
        accounts.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("user-{}", i)).collect();
        assert_eq!(accounts, expected);
    }

    #[test]
    fn test_clones_share_store() {
        let (keychain, _) = test_keychain();
        let other = keychain.clone();

        keychain.set_password("alice", SERVICE, "a", None).unwrap();
        assert_eq!(other.password("alice", SERVICE).unwrap().expose(), "a");
    }
}
