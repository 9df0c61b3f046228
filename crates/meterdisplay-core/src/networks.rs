//! Known WiFi networks.
//!
//! Besides the primary credentials in the settings record, the device keeps
//! an ordered list of networks to fall back on when the primary network is
//! not reachable.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::DeviceSettings;

/// A WiFi network the device may join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownNetwork {
    pub ssid: String,
    pub password: String,
}

impl KnownNetwork {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

/// Ordered list of fallback networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownNetworks(Vec<KnownNetwork>);

impl KnownNetworks {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, network: KnownNetwork) {
        self.0.push(network);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KnownNetwork> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, KnownNetwork> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First network with the given SSID.
    pub fn find(&self, ssid: &str) -> Option<&KnownNetwork> {
        self.0.iter().find(|n| n.ssid == ssid)
    }

    pub fn as_slice(&self) -> &[KnownNetwork] {
        &self.0
    }
}

impl FromIterator<KnownNetwork> for KnownNetworks {
    fn from_iter<I: IntoIterator<Item = KnownNetwork>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KnownNetworks {
    type Item = &'a KnownNetwork;
    type IntoIter = std::slice::Iter<'a, KnownNetwork>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl DeviceSettings {
    /// The primary credentials as a network entry.
    pub fn primary_network(&self) -> KnownNetwork {
        KnownNetwork::new(self.ssid.as_str(), self.password.as_str())
    }
}

/// Order in which networks should be tried.
///
/// The primary network comes first, then the known networks in list order.
/// Entries with an empty SSID are skipped and an SSID is only tried once (the
/// first entry wins). When `visible` holds the SSIDs of a scan, networks that
/// were not seen are dropped without changing the order of the rest.
pub fn connection_plan<'a>(
    primary: Option<&'a KnownNetwork>,
    known: &'a KnownNetworks,
    visible: Option<&[String]>,
) -> Vec<&'a KnownNetwork> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut plan = Vec::new();

    for network in primary.into_iter().chain(known.iter()) {
        if network.ssid.is_empty() || !seen.insert(network.ssid.as_str()) {
            continue;
        }
        if let Some(scan) = visible {
            if !scan.iter().any(|ssid| *ssid == network.ssid) {
                continue;
            }
        }
        plan.push(network);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ssids<'a>(plan: &[&'a KnownNetwork]) -> Vec<&'a str> {
        plan.iter().map(|n| n.ssid.as_str()).collect()
    }

    #[test]
    fn test_find() {
        let networks = KnownNetworks::defaults();
        assert_eq!(
            networks.find("Loretz_Gast").map(|n| n.password.as_str()),
            Some("Lor_Steg_98")
        );
        assert!(networks.find("Nope").is_none());
    }

    #[test]
    fn test_plan_without_scan_keeps_order() {
        let primary = KnownNetwork::new("HomeNet", "secret");
        let known = KnownNetworks::defaults();

        let plan = connection_plan(Some(&primary), &known, None);
        assert_eq!(ssids(&plan), vec!["HomeNet", "PI4RAZ", "Loretz_Gast", "YourWiFi"]);
    }

    #[test]
    fn test_plan_deduplicates_by_ssid() {
        let primary = KnownNetwork::new("PI4RAZ", "primary-pass");
        let known = KnownNetworks::defaults();

        let plan = connection_plan(Some(&primary), &known, None);
        assert_eq!(ssids(&plan), vec!["PI4RAZ", "Loretz_Gast", "YourWiFi"]);
        assert_eq!(plan[0].password, "primary-pass");
    }

    #[test]
    fn test_plan_filters_by_scan() {
        let primary = KnownNetwork::new("HomeNet", "secret");
        let known = KnownNetworks::defaults();
        let scan = vec!["YourWiFi".to_string(), "Neighbour".to_string(), "PI4RAZ".to_string()];

        let plan = connection_plan(Some(&primary), &known, Some(scan.as_slice()));
        assert_eq!(ssids(&plan), vec!["PI4RAZ", "YourWiFi"]);
    }

    #[test]
    fn test_plan_skips_empty_ssid() {
        let primary = KnownNetwork::new("", "");
        let mut known = KnownNetworks::new();
        known.push(KnownNetwork::new("", "orphan"));
        known.push(KnownNetwork::new("Cafe", "latte"));

        let plan = connection_plan(Some(&primary), &known, None);
        assert_eq!(ssids(&plan), vec!["Cafe"]);
    }

    #[test]
    fn test_plan_from_settings() {
        let settings = DeviceSettings::energy_only_defaults();
        let primary = settings.primary_network();
        let known = KnownNetworks::new();

        let plan = connection_plan(Some(&primary), &known, Some(&[][..]));
        assert!(plan.is_empty());

        let plan = connection_plan(Some(&primary), &known, None);
        assert_eq!(ssids(&plan), vec!["YourSSID"]);
    }

    #[test]
    fn test_networks_json_is_a_list() {
        let json = serde_json::to_value(KnownNetworks::defaults()).unwrap();
        assert!(json.is_array());
        assert_eq!(json[1]["ssid"], "Loretz_Gast");
        assert_eq!(json[1]["password"], "Lor_Steg_98");
    }
}
