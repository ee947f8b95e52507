//! In-memory platform store
//!
//! Holds records for the lifetime of the process. Mirrors the keychain's
//! status semantics, including accessibility checks against a simulated
//! device lock state, so it can stand in for the OS store in tests and on
//! hosts without one.

use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::traits::{ItemMatch, ItemQuery, NewItem, PlatformStore, StatusResult};
use super::{validate_account, validate_query, Status};
use crate::accessibility::Accessibility;

/// Simulated device lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// Restarted and not yet unlocked
    BeforeFirstUnlock,
    /// Locked after at least one unlock
    Locked,
    /// Unlocked
    #[default]
    Unlocked,
}

impl LockState {
    /// Whether a secret with the given policy may be read in this state
    pub fn permits(&self, accessibility: Accessibility) -> bool {
        match self {
            Self::Unlocked => true,
            Self::Locked => !accessibility.requires_unlocked(),
            Self::BeforeFirstUnlock => !accessibility.requires_first_unlock(),
        }
    }
}

#[derive(Clone)]
struct StoredItem {
    secret: Vec<u8>,
    accessibility: Accessibility,
}

type Records = IndexMap<(String, String), StoredItem>;

/// In-memory platform store
#[derive(Default)]
pub struct MemoryStore {
    /// (service, account) -> record, in insertion order
    records: RwLock<Records>,
    lock_state: RwLock<LockState>,
}

impl MemoryStore {
    /// Create an empty, unlocked store
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the simulated device lock state
    pub fn set_lock_state(&self, state: LockState) {
        match self.lock_state.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
        debug!("Memory store lock state: {:?}", state);
    }

    /// Current simulated device lock state
    pub fn lock_state(&self) -> LockState {
        match self.lock_state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Number of records across all services
    pub fn len(&self) -> usize {
        match self.records.read() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StatusResult<RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|_| Status::with_message(Status::NOT_AVAILABLE, "Memory store lock poisoned"))
    }

    fn write(&self) -> StatusResult<RwLockWriteGuard<'_, Records>> {
        self.records
            .write()
            .map_err(|_| Status::with_message(Status::NOT_AVAILABLE, "Memory store lock poisoned"))
    }
}

fn query_matches(query: &ItemQuery, service: &str, account: &str) -> bool {
    query.service == service && query.account.as_deref().map_or(true, |a| a == account)
}

impl PlatformStore for MemoryStore {
    fn find(&self, query: &ItemQuery) -> StatusResult<Vec<ItemMatch>> {
        validate_query(query)?;
        let lock_state = self.lock_state();
        let records = self.read()?;

        let mut found = Vec::new();
        for ((service, account), item) in records.iter() {
            if !query_matches(query, service, account) {
                continue;
            }

            let secret = if query.return_data {
                if !lock_state.permits(item.accessibility) {
                    debug!(
                        "Denied read of {}/{} ({}) while {:?}",
                        service, account, item.accessibility, lock_state
                    );
                    return Err(Status::new(Status::INTERACTION_NOT_ALLOWED));
                }
                Some(item.secret.clone())
            } else {
                None
            };

            found.push(ItemMatch {
                account: account.clone(),
                secret,
            });
        }

        if found.is_empty() {
            return Err(Status::item_not_found());
        }
        Ok(found)
    }

    fn add(&self, item: &NewItem) -> StatusResult<()> {
        validate_query(&ItemQuery::service(&item.service))?;
        validate_account(&item.account)?;

        let mut records = self.write()?;
        let key = (item.service.clone(), item.account.clone());
        if records.contains_key(&key) {
            return Err(Status::duplicate_item());
        }

        records.insert(
            key,
            StoredItem {
                secret: item.secret.clone(),
                accessibility: item.accessibility,
            },
        );
        Ok(())
    }

    fn update(
        &self,
        query: &ItemQuery,
        secret: &[u8],
        accessibility: Accessibility,
    ) -> StatusResult<()> {
        validate_query(query)?;

        let mut records = self.write()?;
        let mut updated = false;
        for ((service, account), item) in records.iter_mut() {
            if query_matches(query, service, account) {
                item.secret = secret.to_vec();
                item.accessibility = accessibility;
                updated = true;
            }
        }

        if updated {
            Ok(())
        } else {
            Err(Status::item_not_found())
        }
    }

    fn delete(&self, query: &ItemQuery) -> StatusResult<usize> {
        validate_query(query)?;

        let mut records = self.write()?;
        let before = records.len();
        records.retain(|(service, account), _| !query_matches(query, service, account));
        let removed = before - records.len();

        if removed == 0 {
            return Err(Status::item_not_found());
        }
        Ok(removed)
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Store"
    }
}
