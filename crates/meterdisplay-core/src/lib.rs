//! # meterdisplay-core
//!
//! Settings layer of the meter display device.
//!
//! This crate provides:
//! - The settings record and its two layouts (energy only, energy and water)
//! - Factory defaults for the record, the known networks and the rotation
//! - Well-formedness validation
//! - The fixed-width binary image the record occupies in EEPROM
//! - Daily usage bookkeeping (day rollover, reference maxima)
//! - A configuration storage abstraction with stale-record detection
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! so the same types back the device firmware and the host tooling.

pub mod config;
pub mod defaults;
pub mod image;
pub mod model;
pub mod networks;
pub mod rotation;
pub mod usage;
pub mod validate;

pub use config::{ConfigError, ConfigHandlers, ConfigStorage, MemoryConfigStorage};
pub use model::*;
pub use networks::{connection_plan, KnownNetwork, KnownNetworks};
pub use rotation::{DisplayConfig, ScreenRotation};
pub use usage::{Commodity, DailyLimits, DailyUsage};
pub use validate::{validate_all, validate_networks, validate_settings, ValidationError, Violation};
