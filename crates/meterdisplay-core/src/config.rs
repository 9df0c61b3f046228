//! Configuration storage abstraction.
//!
//! This module provides traits for configuration storage that can be
//! implemented differently on each platform:
//! - Linux: one JSON file per key (`FileConfigStorage` in `meterdisplay-web`)
//! - Tests and tooling: [`MemoryConfigStorage`]
//!
//! Stored settings records carry their version tag (`chkDigit`). Loading a
//! record whose tag does not match the layout the caller expects yields
//! [`ConfigError::Stale`], and [`ConfigHandlers`] replaces such records with
//! factory defaults.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::model::{DeviceSettings, MeterReadings, SettingsLayout};
use crate::networks::KnownNetworks;
use crate::rotation::DisplayConfig;
use crate::usage::{DailyLimits, DailyUsage};
use crate::validate::{validate_networks, validate_settings, ValidationError};

pub const SETTINGS_KEY: &str = "settings";
pub const NETWORKS_KEY: &str = "networks";
pub const DISPLAY_KEY: &str = "display";
pub const YESTERDAY_KEY: &str = "yesterday";

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration was not found.
    #[error("Configuration not found: {0}")]
    NotFound(String),

    /// Failed to read configuration.
    #[error("Read error: {0}")]
    ReadError(String),

    /// Failed to write configuration.
    #[error("Write error: {0}")]
    WriteError(String),

    /// Configuration data is invalid.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Stored record was written for another layout.
    #[error("Stale settings: stored tag {found:?}, expected {expected:?}")]
    Stale { found: char, expected: char },

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    /// Storage is not available.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ConfigError {
    /// Whether the stored value should be replaced by defaults.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigError::NotFound(_) | ConfigError::Stale { .. } | ConfigError::InvalidData(_)
        )
    }
}

/// Settings record as persisted, with its version tag.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    chk_digit: char,
    #[serde(flatten)]
    settings: DeviceSettings,
}

/// Abstract configuration storage.
///
/// Implementations only provide raw string access by key; the typed
/// accessors are provided on top of it. All methods are synchronous to
/// support embedded platforms.
pub trait ConfigStorage: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Store a raw value under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), ConfigError>;

    /// Check if a key exists.
    fn has_key(&self, key: &str) -> bool {
        matches!(self.read(key), Ok(Some(_)))
    }

    // ========================================================================
    // Settings Record
    // ========================================================================

    /// Load the settings record, requiring the `expected` layout.
    fn load_settings(&self, expected: SettingsLayout) -> Result<DeviceSettings, ConfigError> {
        let stored: StoredSettings = load_json(self, SETTINGS_KEY)?;

        if stored.chk_digit != expected.tag() {
            return Err(ConfigError::Stale {
                found: stored.chk_digit,
                expected: expected.tag(),
            });
        }
        if stored.settings.layout() != expected {
            return Err(ConfigError::InvalidData(format!(
                "record tagged {:?} does not have the {} shape",
                stored.chk_digit, expected
            )));
        }

        Ok(stored.settings)
    }

    /// Save the settings record with its version tag.
    fn save_settings(&self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        let stored = StoredSettings {
            chk_digit: settings.version_tag(),
            settings: settings.clone(),
        };
        save_json(self, SETTINGS_KEY, &stored)
    }

    // ========================================================================
    // Known Networks
    // ========================================================================

    fn load_networks(&self) -> Result<KnownNetworks, ConfigError> {
        load_json(self, NETWORKS_KEY)
    }

    fn save_networks(&self, networks: &KnownNetworks) -> Result<(), ConfigError> {
        save_json(self, NETWORKS_KEY, networks)
    }

    // ========================================================================
    // Display
    // ========================================================================

    fn load_display(&self) -> Result<DisplayConfig, ConfigError> {
        load_json(self, DISPLAY_KEY)
    }

    fn save_display(&self, display: &DisplayConfig) -> Result<(), ConfigError> {
        save_json(self, DISPLAY_KEY, display)
    }

    // ========================================================================
    // Usage History
    // ========================================================================

    /// Load the usage of the last closed day.
    fn load_yesterday(&self) -> Result<DailyUsage, ConfigError> {
        load_json(self, YESTERDAY_KEY)
    }

    fn save_yesterday(&self, usage: &DailyUsage) -> Result<(), ConfigError> {
        save_json(self, YESTERDAY_KEY, usage)
    }
}

fn load_json<T, S>(storage: &S, key: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    S: ConfigStorage + ?Sized,
{
    let json = storage
        .read(key)?
        .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
    serde_json::from_str(&json).map_err(|e| ConfigError::InvalidData(format!("{}: {}", key, e)))
}

fn save_json<T, S>(storage: &S, key: &str, value: &T) -> Result<(), ConfigError>
where
    T: Serialize + ?Sized,
    S: ConfigStorage + ?Sized,
{
    let json =
        serde_json::to_string_pretty(value).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    storage.write(key, &json)
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Configuration storage kept in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStorage for MemoryConfigStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let data = self
            .data
            .read()
            .map_err(|_| ConfigError::StorageUnavailable("lock poisoned".to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| ConfigError::StorageUnavailable("lock poisoned".to_string()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| ConfigError::StorageUnavailable("lock poisoned".to_string()))?;
        data.remove(key);
        Ok(())
    }
}

// ============================================================================
// Handler Logic (framework-agnostic)
// ============================================================================

/// Configuration handler logic shared by the firmware and the REST API.
///
/// Framework-specific code wraps these with its own request/response types.
pub struct ConfigHandlers;

impl ConfigHandlers {
    /// Load the settings record, falling back to `defaults` when nothing
    /// usable is stored. The defaults are persisted in that case.
    pub fn load_or_default<S: ConfigStorage + ?Sized>(
        storage: &S,
        defaults: DeviceSettings,
    ) -> Result<DeviceSettings, ConfigError> {
        match storage.load_settings(defaults.layout()) {
            Ok(settings) => Ok(settings),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, tag = %defaults.version_tag(), "Using default settings");
                storage.save_settings(&defaults)?;
                Ok(defaults)
            }
            Err(e) => Err(e),
        }
    }

    /// Load the known networks, falling back to the built-in list.
    pub fn networks_or_default<S: ConfigStorage + ?Sized>(
        storage: &S,
    ) -> Result<KnownNetworks, ConfigError> {
        match storage.load_networks() {
            Ok(networks) => Ok(networks),
            Err(e) if e.is_recoverable() => {
                info!(error = %e, "Using default known networks");
                let networks = KnownNetworks::defaults();
                storage.save_networks(&networks)?;
                Ok(networks)
            }
            Err(e) => Err(e),
        }
    }

    /// Load the display configuration, falling back to no rotation.
    pub fn display_or_default<S: ConfigStorage + ?Sized>(
        storage: &S,
    ) -> Result<DisplayConfig, ConfigError> {
        match storage.load_display() {
            Ok(display) => Ok(display),
            Err(e) if e.is_recoverable() => {
                info!(error = %e, "Using default display configuration");
                let display = DisplayConfig::default();
                storage.save_display(&display)?;
                Ok(display)
            }
            Err(e) => Err(e),
        }
    }

    /// Validate and store a settings record for the given layout.
    pub fn put_settings<S: ConfigStorage + ?Sized>(
        storage: &S,
        layout: SettingsLayout,
        settings: &DeviceSettings,
    ) -> Result<(), ConfigError> {
        if settings.layout() != layout {
            return Err(ConfigError::Stale {
                found: settings.version_tag(),
                expected: layout.tag(),
            });
        }
        validate_settings(settings)?;
        storage.save_settings(settings)?;
        debug!(tag = %settings.version_tag(), "Saved settings");
        Ok(())
    }

    /// Validate and store the known networks.
    pub fn put_networks<S: ConfigStorage + ?Sized>(
        storage: &S,
        networks: &KnownNetworks,
    ) -> Result<(), ConfigError> {
        validate_networks(networks)?;
        storage.save_networks(networks)?;
        debug!(count = networks.len(), "Saved known networks");
        Ok(())
    }

    /// Today's reference maxima from the stored record and usage history.
    pub fn limits<S: ConfigStorage + ?Sized>(
        storage: &S,
        layout: SettingsLayout,
    ) -> Result<DailyLimits, ConfigError> {
        let settings = storage.load_settings(layout)?;
        let yesterday = match storage.load_yesterday() {
            Ok(usage) => Some(usage),
            Err(ConfigError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(settings.reference_max(yesterday.as_ref()))
    }

    /// Close the day on the stored record.
    ///
    /// Persists the moved readings and the day's usage, and returns the usage
    /// together with the reference maxima for the new day.
    pub fn close_day<S: ConfigStorage + ?Sized>(
        storage: &S,
        layout: SettingsLayout,
        current: MeterReadings,
    ) -> Result<(DailyUsage, DailyLimits), ConfigError> {
        let mut settings = storage.load_settings(layout)?;
        let usage = settings.close_day(current);
        storage.save_settings(&settings)?;
        storage.save_yesterday(&usage)?;

        let limits = settings.reference_max(Some(&usage));
        info!(?usage, ?limits, "Day closed");
        Ok((usage, limits))
    }
}
