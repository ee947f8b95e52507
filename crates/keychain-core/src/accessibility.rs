//! Accessibility policy for stored secrets
//!
//! The policy only informs the platform store when a secret may be read; the
//! facade itself never acts on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// When the platform permits a stored secret to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Only while the device is unlocked
    #[default]
    WhenUnlocked,
    /// After the first unlock following a restart
    AfterFirstUnlock,
    /// Regardless of lock state
    Always,
    /// Only while unlocked, and only if a passcode is set; never migrates
    WhenPasscodeSetThisDeviceOnly,
    /// Only while unlocked; never migrates to another device
    WhenUnlockedThisDeviceOnly,
    /// After first unlock; never migrates to another device
    AfterFirstUnlockThisDeviceOnly,
    /// Regardless of lock state; never migrates to another device
    AlwaysThisDeviceOnly,
}

/// Unknown accessibility name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown accessibility policy: {0}")]
pub struct ParseAccessibilityError(String);

impl Accessibility {
    pub const ALL: [Accessibility; 7] = [
        Self::WhenUnlocked,
        Self::AfterFirstUnlock,
        Self::Always,
        Self::WhenPasscodeSetThisDeviceOnly,
        Self::WhenUnlockedThisDeviceOnly,
        Self::AfterFirstUnlockThisDeviceOnly,
        Self::AlwaysThisDeviceOnly,
    ];

    /// Stable name used in settings files and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhenUnlocked => "when_unlocked",
            Self::AfterFirstUnlock => "after_first_unlock",
            Self::Always => "always",
            Self::WhenPasscodeSetThisDeviceOnly => "when_passcode_set_this_device_only",
            Self::WhenUnlockedThisDeviceOnly => "when_unlocked_this_device_only",
            Self::AfterFirstUnlockThisDeviceOnly => "after_first_unlock_this_device_only",
            Self::AlwaysThisDeviceOnly => "always_this_device_only",
        }
    }

    /// Whether the secret is excluded from backups and device migration
    pub fn is_device_only(&self) -> bool {
        matches!(
            self,
            Self::WhenPasscodeSetThisDeviceOnly
                | Self::WhenUnlockedThisDeviceOnly
                | Self::AfterFirstUnlockThisDeviceOnly
                | Self::AlwaysThisDeviceOnly
        )
    }

    /// Whether reading requires the device to be currently unlocked
    pub fn requires_unlocked(&self) -> bool {
        matches!(
            self,
            Self::WhenUnlocked
                | Self::WhenPasscodeSetThisDeviceOnly
                | Self::WhenUnlockedThisDeviceOnly
        )
    }

    /// Whether reading requires at least one unlock since boot
    pub fn requires_first_unlock(&self) -> bool {
        !matches!(self, Self::Always | Self::AlwaysThisDeviceOnly)
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accessibility {
    type Err = ParseAccessibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| ParseAccessibilityError(s.to_string()))
    }
}
