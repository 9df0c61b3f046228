//! Settings record types.
//!
//! The device keeps one settings record. Two shapes of it exist in the field:
//! - Energy only: a single peer (the energy meter bridge)
//! - Energy and water: a second peer plus a daily water budget
//!
//! Each shape carries its own single-character version tag, which the
//! persisted copy is checked against on boot. The tag is derived from the
//! shape, so two different shapes can never share a tag.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Capacity of the WiFi SSID field, in bytes.
pub const SSID_CAPACITY: usize = 16;

/// Capacity of the WiFi password field, in bytes.
pub const PASSPHRASE_CAPACITY: usize = 27;

/// Errors raised when a value does not fit its field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("value is {len} bytes, field holds at most {capacity}")]
    TooLong { len: usize, capacity: usize },

    #[error("value contains a NUL byte")]
    ContainsNul,

    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

// ============================================================================
// Bounded strings
// ============================================================================

/// A string that fits a fixed-size byte field.
///
/// The bound is checked on construction and on deserialization, so an
/// oversized value can never reach the persisted image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundedString<const N: usize>(String);

/// WiFi network name as stored in the settings record.
pub type Ssid = BoundedString<SSID_CAPACITY>;

/// WiFi password as stored in the settings record.
pub type Passphrase = BoundedString<PASSPHRASE_CAPACITY>;

impl<const N: usize> BoundedString<N> {
    /// Field capacity in bytes.
    pub const CAPACITY: usize = N;

    /// Create a bounded string, rejecting values that do not fit.
    pub fn new(value: &str) -> Result<Self, FieldError> {
        if value.len() > N {
            return Err(FieldError::TooLong {
                len: value.len(),
                capacity: N,
            });
        }
        if value.contains('\0') {
            return Err(FieldError::ContainsNul);
        }
        Ok(Self(value.to_string()))
    }

    /// Create a bounded string, cutting the value at the last character
    /// boundary that fits and at the first NUL byte.
    pub fn truncating(value: &str) -> Self {
        let value = value.split('\0').next().unwrap_or_default();
        let mut end = value.len().min(N);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Self(value[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> TryFrom<String> for BoundedString<N> {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl<const N: usize> TryFrom<&str> for BoundedString<N> {
    type Error = FieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const N: usize> From<BoundedString<N>> for String {
    fn from(value: BoundedString<N>) -> Self {
        value.0
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Layout and version tag
// ============================================================================

/// Shape of the settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingsLayout {
    /// One peer, no water budget. Tagged `'%'`.
    EnergyOnly,
    /// Energy and water peers plus a water budget. Tagged `'!'`.
    EnergyAndWater,
}

impl SettingsLayout {
    pub const ALL: [SettingsLayout; 2] = [SettingsLayout::EnergyOnly, SettingsLayout::EnergyAndWater];

    /// Version tag written as the first byte of the persisted record.
    pub const fn tag(self) -> char {
        match self {
            SettingsLayout::EnergyOnly => '%',
            SettingsLayout::EnergyAndWater => '!',
        }
    }

    /// Look up the layout a version tag belongs to.
    pub fn from_tag(tag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|layout| layout.tag() == tag)
    }

    pub const fn has_water(self) -> bool {
        matches!(self, SettingsLayout::EnergyAndWater)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SettingsLayout::EnergyOnly => "energy-only",
            SettingsLayout::EnergyAndWater => "energy-and-water",
        }
    }
}

impl fmt::Display for SettingsLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|layout| layout.as_str() == s)
            .ok_or_else(|| format!("unknown settings layout: {}", s))
    }
}

// ============================================================================
// Preferred day
// ============================================================================

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Day of the week the display favours, or unset.
///
/// Persisted as an index: `-1` when unset, `0` (Monday) through `6` (Sunday).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct PreferredDay(Option<Weekday>);

impl PreferredDay {
    pub const UNSET: PreferredDay = PreferredDay(None);

    pub const fn new(day: Weekday) -> Self {
        Self(Some(day))
    }

    pub fn from_index(index: i32) -> Result<Self, FieldError> {
        match index {
            -1 => Ok(Self::UNSET),
            0..=6 => Ok(Self(Some(WEEKDAYS[index as usize]))),
            _ => Err(FieldError::OutOfRange {
                field: "preferred day",
                value: index.into(),
            }),
        }
    }

    pub fn index(self) -> i32 {
        self.0
            .map(|day| day.num_days_from_monday() as i32)
            .unwrap_or(-1)
    }

    pub fn weekday(self) -> Option<Weekday> {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0.is_some()
    }

    /// Whether `date` falls on the preferred day. Always false when unset.
    pub fn matches(self, date: NaiveDate) -> bool {
        self.0 == Some(date.weekday())
    }
}

impl TryFrom<i32> for PreferredDay {
    type Error = FieldError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

impl From<PreferredDay> for i32 {
    fn from(value: PreferredDay) -> Self {
        value.index()
    }
}

// ============================================================================
// Settings record
// ============================================================================

/// Water peer and budget, present only in the energy-and-water layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterConfig {
    /// Address of the water meter device.
    pub peer: Ipv4Addr,

    /// Daily water budget in liters. `0` means no limit.
    pub daily_budget_liters: u32,
}

/// Meter totals seen at the last day rollover.
///
/// Units follow the budgets: kWh for power, m³ for gas, liters for water.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReadings {
    pub power: u32,
    pub gas: u32,
    pub water: u32,
}

/// The device settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    /// WiFi network to join.
    pub ssid: Ssid,

    /// WiFi password.
    pub password: Passphrase,

    /// Address of the energy meter device.
    pub energy_peer: Ipv4Addr,

    /// Water peer and budget (energy-and-water layout only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<WaterConfig>,

    /// Number of beeps when a limit is exceeded.
    pub beeper_count: u8,

    /// Maximum power on a single phase, in watts.
    pub max_phase_power_watts: u32,

    /// Maximum total power, in watts.
    pub max_total_power_watts: u32,

    /// Daily power budget in kWh. `0` means no limit.
    pub daily_power_budget_kwh: u32,

    /// Daily gas budget in m³. `0` means no limit.
    pub daily_gas_budget_m3: u32,

    /// Use yesterday's usage as today's reference maximum.
    pub use_yesterday_as_max: bool,

    /// Index of the screen shown at startup.
    pub display_screen: u8,

    #[serde(default)]
    pub preferred_day: PreferredDay,

    #[serde(default)]
    pub last_readings: MeterReadings,
}

impl DeviceSettings {
    pub fn layout(&self) -> SettingsLayout {
        if self.water.is_some() {
            SettingsLayout::EnergyAndWater
        } else {
            SettingsLayout::EnergyOnly
        }
    }

    /// Version tag of this record's shape.
    pub fn version_tag(&self) -> char {
        self.layout().tag()
    }

    /// Peer device addresses, energy first.
    pub fn peers(&self) -> Vec<Ipv4Addr> {
        let mut peers = vec![self.energy_peer];
        if let Some(water) = &self.water {
            peers.push(water.peer);
        }
        peers
    }
}
