//! # stepstream
//!
//! Multi-axis stepper motion control over streamed pulse hardware, with
//! embedded-hal 1.0 support.
//!
//! A pulse-generator channel clocks out step pulses from 32-bit control
//! words; a bulk-transfer channel feeds it one repeated word per burst.
//! This library turns that pair of channels into a motion controller:
//! device allocation, asynchronous step bursts with completion actions,
//! trapezoidal acceleration ramps with an exact delay-replay mirror, and
//! proportionally synchronized multi-axis moves.
//!
//! ## Features
//!
//! - **Explicit context**: one [`MotionController`] owns all devices, no
//!   globals
//! - **Configuration-driven**: define axes in TOML files
//! - **embedded-hal 1.0**: uses `DelayNs` for polling yields
//! - **no_std compatible**: core library works without standard library
//! - **Backend trait**: hardware behind [`StepperBackend`], with a
//!   host-testable simulator under `std`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepstream::MotionController;
//!
//! let mut controller = MotionController::new(backend, delay);
//! let axis = controller.claim_axis_with_pins(21, 20)?;
//! controller.set_min_speed(axis, 10_000)?;
//! controller.set_max_speed(axis, 60_000)?;
//! controller.set_acceleration(axis, 200_000)?;
//! controller.set_enabled(axis, true)?;
//!
//! // Trapezoidal move: accelerate, coast, decelerate.
//! controller.move_to_position(axis, 4_000)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O, TOML parsing and the simulator
//!   backend
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod hal;
pub mod motion;
pub mod timing;

// Re-exports for ergonomic API
pub use command::ControlWord;
pub use config::{validate_config, AxisConfig, SystemConfig};
pub use device::{DeviceId, RampDirection, RampStack};
pub use error::{ConfigError, Error, Result};
pub use hal::{BurstChannel, PulseBank, PulseChannel, StepperBackend, WiringProgram};
pub use motion::{CompletionAction, MotionController};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};
