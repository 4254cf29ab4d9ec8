//! Axis configuration from TOML.

use heapless::String;
use serde::Deserialize;

use crate::error::{ConfigError, Error, Result};
use crate::hal::WiringProgram;

/// Complete axis configuration from TOML.
///
/// Pins are given either as an explicit `dir_pin`/`step_pin` pair (the
/// wiring program is then chosen by pin order) or as a `base_pin` plus
/// a named `wiring` variant.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Human-readable name (max 32 chars).
    pub name: String<32>,

    /// Direction pin, when pins are given as a pair.
    #[serde(default)]
    pub dir_pin: Option<u8>,

    /// Step pin, when pins are given as a pair.
    #[serde(default)]
    pub step_pin: Option<u8>,

    /// First pin of the wiring program, when given explicitly.
    #[serde(default)]
    pub base_pin: Option<u8>,

    /// Wiring program variant, when given explicitly.
    #[serde(default)]
    pub wiring: Option<WiringProgram>,

    /// Speed position moves start from, in steps/sec.
    #[serde(rename = "min_speed_sps")]
    pub min_speed: u32,

    /// Speed cap for position moves, in steps/sec.
    #[serde(rename = "max_speed_sps")]
    pub max_speed: u32,

    /// Acceleration rate in steps/sec².
    #[serde(default, rename = "acceleration_sps2")]
    pub acceleration: u32,

    /// Whether step output starts enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AxisConfig {
    /// Check the speed range and that one complete pin description is
    /// present.
    pub fn validate(&self) -> Result<()> {
        if self.min_speed == 0 || self.min_speed > self.max_speed {
            return Err(Error::Config(ConfigError::InvalidSpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            }));
        }

        let pin_pair = self.dir_pin.is_some() && self.step_pin.is_some();
        let explicit = self.base_pin.is_some() && self.wiring.is_some();
        if !pin_pair && !explicit {
            return Err(Error::Config(ConfigError::MissingPins(self.name.clone())));
        }

        Ok(())
    }
}
