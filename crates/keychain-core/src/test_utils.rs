//! Test helpers
//!
//! In-process keyring backend installed as the `keyring` crate's default
//! credential builder, with hooks for injecting write failures and slowing
//! down reads. Tests share one instance, so each test uses its own service.

use keyring::credential::{Credential, CredentialApi, CredentialBuilderApi};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

type Key = (String, String);

fn key(service: &str, user: &str) -> Key {
    (service.to_string(), user.to_string())
}

// ===== MockKeyring =====

#[derive(Default)]
pub struct MockKeyring {
    entries: Mutex<HashMap<Key, String>>,
    /// (service, user) pairs whose next write fails once
    failing_writes: Mutex<HashSet<Key>>,
    /// Services whose reads are delayed after the value is fetched
    slow_services: Mutex<HashMap<String, Duration>>,
}

impl MockKeyring {
    /// Fail the next write to (service, user)
    pub fn fail_next_write(&self, service: &str, user: &str) {
        self.failing_writes.lock().unwrap().insert(key(service, user));
    }

    /// Delay every read in the service
    pub fn slow_reads(&self, service: &str, delay: Duration) {
        self.slow_services
            .lock()
            .unwrap()
            .insert(service.to_string(), delay);
    }

    /// Raw stored value, bypassing the credential API
    pub fn get(&self, service: &str, user: &str) -> Option<String> {
        self.entries.lock().unwrap().get(&key(service, user)).cloned()
    }

    /// Remove an entry as another keychain client would
    pub fn remove(&self, service: &str, user: &str) {
        self.entries.lock().unwrap().remove(&key(service, user));
    }
}

/// Shared mock keyring, installed as the default backend on first use
pub fn mock_keyring() -> Arc<MockKeyring> {
    static MOCK: OnceLock<Arc<MockKeyring>> = OnceLock::new();

    MOCK.get_or_init(|| {
        let mock = Arc::new(MockKeyring::default());
        keyring::set_default_credential_builder(Box::new(MockBuilder(mock.clone())));
        mock
    })
    .clone()
}

// ===== keyring plumbing =====

struct MockBuilder(Arc<MockKeyring>);

impl CredentialBuilderApi for MockBuilder {
    fn build(
        &self,
        _target: Option<&str>,
        service: &str,
        user: &str,
    ) -> keyring::Result<Box<Credential>> {
        Ok(Box::new(MockCredential {
            keyring: self.0.clone(),
            key: key(service, user),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MockCredential {
    keyring: Arc<MockKeyring>,
    key: Key,
}

impl CredentialApi for MockCredential {
    fn set_password(&self, password: &str) -> keyring::Result<()> {
        if self.keyring.failing_writes.lock().unwrap().remove(&self.key) {
            return Err(keyring::Error::PlatformFailure("injected write failure".into()));
        }

        self.keyring
            .entries
            .lock()
            .unwrap()
            .insert(self.key.clone(), password.to_string());
        Ok(())
    }

    fn get_password(&self) -> keyring::Result<String> {
        let value = self.keyring.entries.lock().unwrap().get(&self.key).cloned();

        let delay = self.keyring.slow_services.lock().unwrap().get(&self.key.0).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        value.ok_or(keyring::Error::NoEntry)
    }

    fn delete_password(&self) -> keyring::Result<()> {
        match self.keyring.entries.lock().unwrap().remove(&self.key) {
            Some(_) => Ok(()),
            None => Err(keyring::Error::NoEntry),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
