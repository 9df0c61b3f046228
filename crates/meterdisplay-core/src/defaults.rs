//! Factory defaults.
//!
//! These are the values a device boots with when no settings were persisted
//! yet, or when the persisted record carries a tag from another layout.

use std::net::Ipv4Addr;

use crate::model::{
    DeviceSettings, MeterReadings, Passphrase, PreferredDay, SettingsLayout, Ssid, WaterConfig,
};
use crate::networks::{KnownNetwork, KnownNetworks};

const DEFAULT_SSID: &str = "YourSSID";
const DEFAULT_PASSWORD: &str = "YourWiFiPass";
const DEFAULT_ENERGY_PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 5, 134);
const DEFAULT_WATER_PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 5, 104);

const DEFAULT_NETWORKS: [(&str, &str); 3] = [
    ("PI4RAZ", "PI4RAZ_Zoetermeer"),
    ("Loretz_Gast", "Lor_Steg_98"),
    ("YourWiFi", "YourPass!"),
];

impl DeviceSettings {
    /// Defaults for the energy-and-water layout (tag `'!'`).
    pub fn energy_and_water_defaults() -> Self {
        Self {
            water: Some(WaterConfig {
                peer: DEFAULT_WATER_PEER,
                daily_budget_liters: 500,
            }),
            ..Self::energy_only_defaults()
        }
    }

    /// Defaults for the energy-only layout (tag `'%'`).
    pub fn energy_only_defaults() -> Self {
        Self {
            ssid: Ssid::truncating(DEFAULT_SSID),
            password: Passphrase::truncating(DEFAULT_PASSWORD),
            energy_peer: DEFAULT_ENERGY_PEER,
            water: None,
            beeper_count: 2,
            max_phase_power_watts: 3680,
            max_total_power_watts: 10000,
            daily_power_budget_kwh: 25,
            daily_gas_budget_m3: 5,
            use_yesterday_as_max: true,
            display_screen: 0,
            preferred_day: PreferredDay::UNSET,
            last_readings: MeterReadings::default(),
        }
    }

    pub fn defaults_for(layout: SettingsLayout) -> Self {
        match layout {
            SettingsLayout::EnergyOnly => Self::energy_only_defaults(),
            SettingsLayout::EnergyAndWater => Self::energy_and_water_defaults(),
        }
    }
}

impl KnownNetworks {
    /// Networks tried after the primary credentials, in order.
    pub fn defaults() -> Self {
        DEFAULT_NETWORKS
            .iter()
            .map(|(ssid, password)| KnownNetwork::new(*ssid, *password))
            .collect()
    }
}
