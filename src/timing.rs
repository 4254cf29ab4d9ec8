//! Step timing constants and speed/delay conversions.
//!
//! The pulse generator self-paces from the delay field of each control
//! word, so speed is expressed as a delay and converted back for the
//! ramp math. The two conversions are inexact inverses by design; the
//! operation order below is normative because reordering the float
//! arithmetic changes the rounding.

use crate::command::DELAY_MAX;

/// Clock divider of the pulse-generation program.
///
/// A divider of 125 gives a maximum step rate of 100,000 steps/sec.
pub const CLOCK_DIV: u32 = 125;

/// Maximum achievable step rate in steps/sec, derived from [`CLOCK_DIV`].
pub const MAX_STEP_RATE: u32 = 12_500_000 / CLOCK_DIV;

/// Lower clamp applied to every delay update.
pub const MIN_DELAY: u32 = 0;

/// Steps per ramp slice: one slice is the unit of ramp adjustment.
pub const NUM_SLICE_STEPS: u32 = 100;

/// Per-slice step counts at or below this are not worth a burst of
/// their own in multi-axis moves; they are folded into the coast phase.
pub const MIN_SLICE_STEPS: u32 = 10;

/// Yield interval of the completion polling loops, in microseconds.
pub const COMPLETION_POLL_US: u32 = 10;

/// Convert a speed in steps/sec into the delay that produces it.
///
/// `delay = max(10 * MAX_STEP_RATE / rate - 10, 0)`, computed through a
/// float intermediate and truncated. A rate of zero maps to
/// [`DELAY_MAX`] (the slowest representable stepping).
pub fn speed_to_delay(rate: u32) -> u32 {
    if rate == 0 {
        return DELAY_MAX;
    }
    let delay = (10.0 * MAX_STEP_RATE as f64) / rate as f64 - 10.0;
    if delay <= 0.0 {
        0
    } else {
        (delay as u32).min(DELAY_MAX)
    }
}

/// Convert a delay back into the speed it produces, in steps/sec.
///
/// `rate = MAX_STEP_RATE / (delay / 10 + 1)`, float intermediate,
/// truncated.
pub fn delay_to_speed(delay: u32) -> u32 {
    (MAX_STEP_RATE as f64 / (delay as f64 / 10.0 + 1.0)) as u32
}
