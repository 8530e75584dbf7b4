//! Store configuration.
//!
//! # Invariants
//! - `max_months >= 1`.
//! - `storage_key` is non-empty after trimming.

use crate::store::retention::EvictionPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of retained months.
pub const DEFAULT_MAX_MONTHS: usize = 3;
/// Default snapshot key inside the key-value backend.
pub const DEFAULT_STORAGE_KEY: &str = "menuData";

/// Invalid store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    ZeroMaxMonths,
    EmptyStorageKey,
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroMaxMonths => write!(f, "max_months must be at least 1"),
            Self::EmptyStorageKey => write!(f, "storage key cannot be empty"),
        }
    }
}

impl Error for SettingsError {}

/// Validated menu store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    max_months: usize,
    eviction: EvictionPolicy,
    storage_key: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_months: DEFAULT_MAX_MONTHS,
            eviction: EvictionPolicy::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl StoreSettings {
    pub fn new(
        max_months: usize,
        eviction: EvictionPolicy,
        storage_key: impl Into<String>,
    ) -> Result<Self, SettingsError> {
        if max_months == 0 {
            return Err(SettingsError::ZeroMaxMonths);
        }
        let storage_key = storage_key.into().trim().to_string();
        if storage_key.is_empty() {
            return Err(SettingsError::EmptyStorageKey);
        }

        Ok(Self {
            max_months,
            eviction,
            storage_key,
        })
    }

    /// Default settings with a different eviction policy.
    pub fn with_eviction(eviction: EvictionPolicy) -> Self {
        Self {
            eviction,
            ..Self::default()
        }
    }

    pub fn max_months(&self) -> usize {
        self.max_months
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}
