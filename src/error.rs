//! Error types for stepstream.
//!
//! Every fallible operation reports through [`Result`]; a rejected motion
//! command is a complete no-op and never reaches the hardware.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepstream operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No free device slot, pulse channel or transfer channel.
    ResourceExhausted,
    /// Sentinel handle or an unclaimed device slot.
    InvalidDevice,
    /// A move was requested while a transfer is still in flight.
    AlreadyRunning,
    /// Requested delay does not fit the 30-bit delay field.
    DelayOutOfRange(u32),
    /// Configuration parsing or validation error.
    Config(ConfigError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration.
    ParseError(heapless::String<128>),
    /// Axis name not found in configuration.
    AxisNotFound(heapless::String<32>),
    /// Invalid speed range (min must be > 0 and <= max).
    InvalidSpeedRange {
        /// Configured minimum speed in steps/sec.
        min: u32,
        /// Configured maximum speed in steps/sec.
        max: u32,
    },
    /// Axis specifies neither (dir_pin, step_pin) nor (base_pin, wiring).
    MissingPins(heapless::String<32>),
    /// File I/O error (std only).
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceExhausted => write!(f, "No free device slot or hardware channel"),
            Error::InvalidDevice => write!(f, "Invalid or unclaimed device handle"),
            Error::AlreadyRunning => write!(f, "Device is already running a transfer"),
            Error::DelayOutOfRange(delay) => {
                write!(f, "Delay {} exceeds the 30-bit delay field", delay)
            }
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::AxisNotFound(name) => write!(f, "Axis '{}' not found", name),
            ConfigError::InvalidSpeedRange { min, max } => {
                write!(f, "Invalid speed range: min {} must be > 0 and <= max {}", min, max)
            }
            ConfigError::MissingPins(name) => {
                write!(f, "Axis '{}' needs dir_pin/step_pin or base_pin/wiring", name)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
