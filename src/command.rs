//! Control word encoding.
//!
//! The pulse generator consumes one packed 32-bit word per beat:
//! bits \[31:2\] carry the inter-step delay, bit 1 the direction and
//! bit 0 the enable flag. The layout is the wire contract with the
//! pulse-generation program and must stay bit-exact.

/// Largest delay value that fits the 30-bit delay field.
pub const DELAY_MAX: u32 = (1 << 30) - 1;

/// Wiring polarity applied to the logical direction before encoding.
///
/// The direction bit on the wire is `logical_direction ^ DIR_POLARITY`,
/// matching the polarity the pulse-generation program expects.
pub const DIR_POLARITY: bool = false;

/// One packed control word as consumed by the pulse generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlWord(u32);

impl ControlWord {
    /// Pack `(delay, direction, enabled)` into a control word.
    ///
    /// `delay` is masked to the 30-bit field; callers that care about
    /// out-of-range delays must reject them before encoding.
    #[inline]
    pub const fn encode(delay: u32, direction: bool, enabled: bool) -> Self {
        Self((((delay & DELAY_MAX) << 1 | direction as u32) << 1) | enabled as u32)
    }

    /// Get the raw 32-bit wire value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Wrap a raw wire value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Extract the delay field.
    #[inline]
    pub const fn delay(self) -> u32 {
        self.0 >> 2
    }

    /// Extract the direction bit.
    #[inline]
    pub const fn direction(self) -> bool {
        self.0 & 0b10 != 0
    }

    /// Extract the enable bit.
    #[inline]
    pub const fn enabled(self) -> bool {
        self.0 & 0b01 != 0
    }
}
