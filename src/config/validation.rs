//! Configuration validation.

use crate::error::Result;

use super::SystemConfig;

/// Validate a system configuration.
///
/// Checks every axis: the speed range is sane and a complete pin
/// description is present.
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    for (_, axis) in config.axes.iter() {
        axis.validate()?;
    }
    Ok(())
}
