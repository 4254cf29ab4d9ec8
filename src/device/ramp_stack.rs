//! Delay-replay stack.
//!
//! During acceleration the delay in effect before each ramp adjustment
//! is pushed here; deceleration pops and applies the values verbatim,
//! so the down-ramp is the exact mirror of the up-ramp rather than a
//! re-derived approximation.

use heapless::Vec;

/// Capacity in delay entries. One entry is recorded per non-coasting
/// acceleration slice, so this bounds the ramp length, not the move
/// length.
pub const RAMP_DEPTH: usize = 256;

/// Fixed-capacity LIFO of delay values, one per device.
#[derive(Debug, Default)]
pub struct RampStack {
    entries: Vec<u32, RAMP_DEPTH>,
}

impl RampStack {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Push a delay value. O(1). Returns the value back on a full stack.
    pub fn push(&mut self, delay: u32) -> Result<(), u32> {
        self.entries.push(delay)
    }

    /// Pop the most recently pushed delay. O(1). `None` when empty.
    pub fn pop(&mut self) -> Option<u32> {
        self.entries.pop()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded delays.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no delays are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
