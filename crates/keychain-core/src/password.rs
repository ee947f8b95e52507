//! Passwords read from the store

use std::str::Utf8Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Password read from a keychain record - zeroed when dropped
///
/// Records hold bytes; a password is a record whose bytes are UTF-8.
#[derive(Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct Password {
    value: String,
}

impl Password {
    /// Decode record bytes, zeroing them if they are not UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Utf8Error> {
        String::from_utf8(bytes)
            .map(|value| Self { value })
            .map_err(|e| {
                let error = e.utf8_error();
                e.into_bytes().zeroize();
                error
            })
    }

    /// Get the password (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Raw UTF-8 bytes, as stored in the record
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Consume and return the inner value
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.value)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .finish()
    }
}
