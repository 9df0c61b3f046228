//! Persisted binary image of the settings record.
//!
//! The record is written to EEPROM as a fixed-width little-endian image whose
//! first byte is the version tag. On boot the tag is compared with the tag of
//! the layout the firmware was built for; a mismatch means the stored record
//! has another shape and must be replaced by defaults.
//!
//! # Layout
//!
//! | Field                  | Width | Notes                         |
//! |------------------------|-------|-------------------------------|
//! | version tag            | 1     | `'!'` or `'%'`                |
//! | SSID                   | 16    | NUL padded                    |
//! | password               | 27    | NUL padded                    |
//! | energy peer            | 16    | dotted quad, NUL padded       |
//! | water peer             | 16    | energy-and-water only         |
//! | beeper count           | 1     |                               |
//! | max phase power        | 4     | i32                           |
//! | max total power        | 4     | i32                           |
//! | daily power budget     | 4     | i32                           |
//! | daily gas budget       | 4     | i32                           |
//! | daily water budget     | 4     | i32, energy-and-water only    |
//! | use yesterday as max   | 1     | non-zero is true              |
//! | display screen         | 1     |                               |
//! | preferred day          | 1     | i8, -1 unset                  |
//! | last power/gas/water   | 3 × 4 | i32                           |
//!
//! Integer fields are signed on the device; negative values are rejected on
//! decode and values above `i32::MAX` are rejected on encode.

use std::net::Ipv4Addr;

use crate::model::{
    BoundedString, DeviceSettings, FieldError, MeterReadings, PreferredDay, SettingsLayout,
    WaterConfig, PASSPHRASE_CAPACITY, SSID_CAPACITY,
};

/// Width of a dotted-quad address field.
pub const ADDRESS_WIDTH: usize = 16;

/// Errors that can occur while encoding or decoding an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,

    #[error("unknown version tag {0:?}")]
    UnknownTag(char),

    #[error("stale image: found tag {found:?}, expected {expected:?}")]
    Stale { found: char, expected: char },

    #[error("image is {len} bytes, layout needs {expected}")]
    Truncated { len: usize, expected: usize },

    #[error("field {field} is not valid UTF-8")]
    InvalidText { field: &'static str },

    #[error("field {field} does not hold a dotted-quad address")]
    InvalidAddress { field: &'static str },

    #[error("field {field} holds negative value {value}")]
    Negative { field: &'static str, value: i32 },

    #[error("field {field} value {value} does not fit the image")]
    Overflow { field: &'static str, value: u32 },

    #[error("field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: FieldError,
    },
}

/// Size of the image for a layout, in bytes.
pub const fn image_len(layout: SettingsLayout) -> usize {
    let energy_only = 1 + SSID_CAPACITY + PASSPHRASE_CAPACITY + ADDRESS_WIDTH + 1 + 4 * 4 + 3 + 3 * 4;
    match layout {
        SettingsLayout::EnergyOnly => energy_only,
        SettingsLayout::EnergyAndWater => energy_only + ADDRESS_WIDTH + 4,
    }
}

// ============================================================================
// Encoding
// ============================================================================

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn i32(&mut self, field: &'static str, value: u32) -> Result<(), ImageError> {
        let value = i32::try_from(value).map_err(|_| ImageError::Overflow { field, value })?;
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn text(&mut self, value: &str, width: usize) {
        let start = self.buf.len();
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.resize(start + width, 0);
    }
}

/// Encode the settings record into its EEPROM image.
pub fn encode(settings: &DeviceSettings) -> Result<Vec<u8>, ImageError> {
    let layout = settings.layout();
    let mut w = Writer {
        buf: Vec::with_capacity(image_len(layout)),
    };

    w.u8(layout.tag() as u8);
    w.text(settings.ssid.as_str(), SSID_CAPACITY);
    w.text(settings.password.as_str(), PASSPHRASE_CAPACITY);
    w.text(&settings.energy_peer.to_string(), ADDRESS_WIDTH);
    if let Some(water) = &settings.water {
        w.text(&water.peer.to_string(), ADDRESS_WIDTH);
    }
    w.u8(settings.beeper_count);
    w.i32("maxPhasePower", settings.max_phase_power_watts)?;
    w.i32("maxTotalPower", settings.max_total_power_watts)?;
    w.i32("dailyPowerBudget", settings.daily_power_budget_kwh)?;
    w.i32("dailyGasBudget", settings.daily_gas_budget_m3)?;
    if let Some(water) = &settings.water {
        w.i32("dailyWaterBudget", water.daily_budget_liters)?;
    }
    w.u8(settings.use_yesterday_as_max as u8);
    w.u8(settings.display_screen);
    w.u8(settings.preferred_day.index() as i8 as u8);
    w.i32("lastPower", settings.last_readings.power)?;
    w.i32("lastGas", settings.last_readings.gas)?;
    w.i32("lastWater", settings.last_readings.water)?;

    Ok(w.buf)
}

// ============================================================================
// Decoding
// ============================================================================

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    // Bounds are checked once against `image_len` before reading starts.
    fn take(&mut self, width: usize) -> &'a [u8] {
        let slice = &self.buf[self.pos..self.pos + width];
        self.pos += width;
        slice
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn i32(&mut self, field: &'static str) -> Result<u32, ImageError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4));
        let value = i32::from_le_bytes(bytes);
        u32::try_from(value).map_err(|_| ImageError::Negative { field, value })
    }

    fn text(&mut self, field: &'static str, width: usize) -> Result<&'a str, ImageError> {
        let raw = self.take(width);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end]).map_err(|_| ImageError::InvalidText { field })
    }

    fn bounded<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<BoundedString<N>, ImageError> {
        let text = self.text(field, N)?;
        BoundedString::new(text).map_err(|source| ImageError::Field { field, source })
    }

    fn address(&mut self, field: &'static str) -> Result<Ipv4Addr, ImageError> {
        self.text(field, ADDRESS_WIDTH)?
            .parse()
            .map_err(|_| ImageError::InvalidAddress { field })
    }
}

/// Decode an EEPROM image, requiring the layout the caller was built for.
///
/// Bytes past the end of the image are ignored, so a whole EEPROM page can be
/// passed in.
pub fn decode(image: &[u8], expected: SettingsLayout) -> Result<DeviceSettings, ImageError> {
    let tag = *image.first().ok_or(ImageError::Empty)? as char;
    let layout = SettingsLayout::from_tag(tag).ok_or(ImageError::UnknownTag(tag))?;
    if layout != expected {
        return Err(ImageError::Stale {
            found: tag,
            expected: expected.tag(),
        });
    }

    let needed = image_len(layout);
    if image.len() < needed {
        return Err(ImageError::Truncated {
            len: image.len(),
            expected: needed,
        });
    }

    let mut r = Reader { buf: image, pos: 1 };

    let ssid = r.bounded("ssid")?;
    let password = r.bounded("password")?;
    let energy_peer = r.address("energyPeer")?;
    let water_peer = if layout.has_water() {
        Some(r.address("waterPeer")?)
    } else {
        None
    };
    let beeper_count = r.u8();
    let max_phase_power_watts = r.i32("maxPhasePower")?;
    let max_total_power_watts = r.i32("maxTotalPower")?;
    let daily_power_budget_kwh = r.i32("dailyPowerBudget")?;
    let daily_gas_budget_m3 = r.i32("dailyGasBudget")?;
    let water = match water_peer {
        Some(peer) => Some(WaterConfig {
            peer,
            daily_budget_liters: r.i32("dailyWaterBudget")?,
        }),
        None => None,
    };
    let use_yesterday_as_max = r.u8() != 0;
    let display_screen = r.u8();
    let preferred_day = PreferredDay::from_index(r.u8() as i8 as i32).map_err(|source| {
        ImageError::Field {
            field: "preferredDay",
            source,
        }
    })?;
    let last_readings = MeterReadings {
        power: r.i32("lastPower")?,
        gas: r.i32("lastGas")?,
        water: r.i32("lastWater")?,
    };

    Ok(DeviceSettings {
        ssid,
        password,
        energy_peer,
        water,
        beeper_count,
        max_phase_power_watts,
        max_total_power_watts,
        daily_power_budget_kwh,
        daily_gas_budget_m3,
        use_yesterday_as_max,
        display_screen,
        preferred_day,
        last_readings,
    })
}
