//! Daily usage bookkeeping.
//!
//! At the end of each day the current meter totals are compared with the
//! totals stored in the settings record to get the day's usage, and the
//! stored totals move forward. Today's reference maxima come either from the
//! configured budgets or, when `use_yesterday_as_max` is set, from
//! yesterday's usage.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{DeviceSettings, MeterReadings};

/// A metered commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Commodity {
    Power,
    Gas,
    Water,
}

/// Usage over one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub power_kwh: u32,
    pub gas_m3: u32,
    pub water_liters: u32,
}

/// Reference maxima for one day. A limit of `0` means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLimits {
    pub power_kwh: u32,
    pub gas_m3: u32,
    /// Absent when the device has no water meter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_liters: Option<u32>,
}

impl DailyLimits {
    /// Commodities whose usage went over the limit.
    pub fn exceeded_by(&self, usage: &DailyUsage) -> Vec<Commodity> {
        let over = |limit: u32, used: u32| limit > 0 && used > limit;

        let mut exceeded = Vec::new();
        if over(self.power_kwh, usage.power_kwh) {
            exceeded.push(Commodity::Power);
        }
        if over(self.gas_m3, usage.gas_m3) {
            exceeded.push(Commodity::Gas);
        }
        if let Some(limit) = self.water_liters {
            if over(limit, usage.water_liters) {
                exceeded.push(Commodity::Water);
            }
        }
        exceeded
    }
}

fn used_since(commodity: Commodity, last: u32, current: u32) -> u32 {
    current.checked_sub(last).unwrap_or_else(|| {
        warn!(
            ?commodity,
            last, current, "Meter total went backwards, counting no usage"
        );
        0
    })
}

impl DeviceSettings {
    /// Close the current day.
    ///
    /// Returns the usage since the previous rollover and stores `current` as
    /// the new last readings.
    pub fn close_day(&mut self, current: MeterReadings) -> DailyUsage {
        let last = self.last_readings;
        let usage = DailyUsage {
            power_kwh: used_since(Commodity::Power, last.power, current.power),
            gas_m3: used_since(Commodity::Gas, last.gas, current.gas),
            water_liters: used_since(Commodity::Water, last.water, current.water),
        };
        self.last_readings = current;

        debug!(?usage, "Closed day");
        usage
    }

    /// Today's reference maxima.
    ///
    /// With `use_yesterday_as_max` set, each commodity takes yesterday's usage
    /// when there is a non-zero value for it, and the budget otherwise.
    pub fn reference_max(&self, yesterday: Option<&DailyUsage>) -> DailyLimits {
        let pick = |budget: u32, used: Option<u32>| match used {
            Some(used) if self.use_yesterday_as_max && used > 0 => used,
            _ => budget,
        };

        DailyLimits {
            power_kwh: pick(self.daily_power_budget_kwh, yesterday.map(|u| u.power_kwh)),
            gas_m3: pick(self.daily_gas_budget_m3, yesterday.map(|u| u.gas_m3)),
            water_liters: self.water.as_ref().map(|water| {
                pick(water.daily_budget_liters, yesterday.map(|u| u.water_liters))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn readings(power: u32, gas: u32, water: u32) -> MeterReadings {
        MeterReadings { power, gas, water }
    }

    #[test]
    fn test_close_day_moves_readings() {
        let mut settings = DeviceSettings::energy_and_water_defaults();
        settings.last_readings = readings(1000, 200, 30_000);

        let usage = settings.close_day(readings(1012, 203, 30_250));
        assert_eq!(
            usage,
            DailyUsage {
                power_kwh: 12,
                gas_m3: 3,
                water_liters: 250
            }
        );
        assert_eq!(settings.last_readings, readings(1012, 203, 30_250));
    }

    #[test]
    fn test_close_day_counter_reset() {
        let mut settings = DeviceSettings::energy_only_defaults();
        settings.last_readings = readings(5000, 10, 0);

        // meter replaced: power total restarts low
        let usage = settings.close_day(readings(3, 12, 0));
        assert_eq!(usage.power_kwh, 0);
        assert_eq!(usage.gas_m3, 2);
        assert_eq!(settings.last_readings.power, 3);
    }

    #[test]
    fn test_reference_max_uses_budget_without_history() {
        let settings = DeviceSettings::energy_and_water_defaults();
        assert_eq!(
            settings.reference_max(None),
            DailyLimits {
                power_kwh: 25,
                gas_m3: 5,
                water_liters: Some(500)
            }
        );
    }

    #[test]
    fn test_reference_max_uses_yesterday() {
        let settings = DeviceSettings::energy_and_water_defaults();
        let yesterday = DailyUsage {
            power_kwh: 18,
            gas_m3: 0,
            water_liters: 320,
        };

        // gas had no usage, so it keeps its budget
        assert_eq!(
            settings.reference_max(Some(&yesterday)),
            DailyLimits {
                power_kwh: 18,
                gas_m3: 5,
                water_liters: Some(320)
            }
        );
    }

    #[test]
    fn test_reference_max_flag_off() {
        let mut settings = DeviceSettings::energy_only_defaults();
        settings.use_yesterday_as_max = false;
        let yesterday = DailyUsage {
            power_kwh: 40,
            gas_m3: 9,
            water_liters: 100,
        };

        assert_eq!(
            settings.reference_max(Some(&yesterday)),
            DailyLimits {
                power_kwh: 25,
                gas_m3: 5,
                water_liters: None
            }
        );
    }

    #[test]
    fn test_exceeded_by() {
        let limits = DailyLimits {
            power_kwh: 25,
            gas_m3: 0,
            water_liters: Some(500),
        };
        let usage = DailyUsage {
            power_kwh: 26,
            gas_m3: 99,
            water_liters: 500,
        };

        // zero gas limit means unlimited, water at the limit is not over it
        assert_eq!(limits.exceeded_by(&usage), vec![Commodity::Power]);
    }

    #[test]
    fn test_limits_json_omits_water_when_absent() {
        let limits = DeviceSettings::energy_only_defaults().reference_max(None);
        let json = serde_json::to_value(limits).unwrap();
        assert_eq!(json, serde_json::json!({"powerKwh": 25, "gasM3": 5}));
    }
}
