//! Well-formedness checks for the settings record and the known networks.
//!
//! Field bounds, the rotation range and non-negative thresholds are already
//! guaranteed by the types. What remains are checks across fields and the
//! contents of the network list.

use std::fmt;
use std::net::Ipv4Addr;

use crate::model::DeviceSettings;
use crate::networks::KnownNetworks;

/// A single well-formedness problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("WiFi SSID is empty")]
    EmptySsid,

    #[error("known network #{index} has an empty SSID")]
    EmptyNetworkSsid { index: usize },

    #[error("known network '{ssid}' has an empty password")]
    EmptyNetworkPassword { index: usize, ssid: String },

    /// A masked password was sent for a network with no stored password.
    #[error("known network '{ssid}' has no stored password to keep")]
    UnknownStoredPassword { index: usize, ssid: String },

    #[error("per-phase power limit {phase} W exceeds total power limit {total} W")]
    PhaseAboveTotal { phase: u32, total: u32 },

    #[error("peer address {address} is unspecified")]
    UnspecifiedPeer { address: Ipv4Addr },

    #[error("energy and water peers share address {address}")]
    SharedPeerAddress { address: Ipv4Addr },
}

/// All violations found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    fn check(violations: Vec<Violation>) -> Result<(), ValidationError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Violation messages, for reporting.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

fn settings_violations(settings: &DeviceSettings) -> Vec<Violation> {
    let mut violations = Vec::new();

    if settings.ssid.is_empty() {
        violations.push(Violation::EmptySsid);
    }

    if settings.max_phase_power_watts > settings.max_total_power_watts {
        violations.push(Violation::PhaseAboveTotal {
            phase: settings.max_phase_power_watts,
            total: settings.max_total_power_watts,
        });
    }

    for address in settings.peers() {
        if address.is_unspecified() {
            violations.push(Violation::UnspecifiedPeer { address });
        }
    }

    if let Some(water) = &settings.water {
        if water.peer == settings.energy_peer && !water.peer.is_unspecified() {
            violations.push(Violation::SharedPeerAddress {
                address: water.peer,
            });
        }
    }

    violations
}

fn network_violations(networks: &KnownNetworks) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (index, network) in networks.iter().enumerate() {
        if network.ssid.is_empty() {
            violations.push(Violation::EmptyNetworkSsid { index });
        }
        if network.password.is_empty() {
            violations.push(Violation::EmptyNetworkPassword {
                index,
                ssid: network.ssid.clone(),
            });
        }
    }

    violations
}

pub fn validate_settings(settings: &DeviceSettings) -> Result<(), ValidationError> {
    ValidationError::check(settings_violations(settings))
}

pub fn validate_networks(networks: &KnownNetworks) -> Result<(), ValidationError> {
    ValidationError::check(network_violations(networks))
}

/// Validate the settings record and the network list together.
pub fn validate_all(
    settings: &DeviceSettings,
    networks: &KnownNetworks,
) -> Result<(), ValidationError> {
    let mut violations = settings_violations(settings);
    violations.extend(network_violations(networks));
    ValidationError::check(violations)
}
