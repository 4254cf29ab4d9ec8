//! Hardware capability seam.
//!
//! The motion controller never touches registers directly; everything
//! the pulse-generation and bulk-transfer hardware can do is expressed
//! through [`StepperBackend`]. An embedded target implements it over
//! the real peripherals; hosts use [`sim::SimBackend`] for tests and
//! bring-up.

use serde::Deserialize;

#[cfg(feature = "std")]
pub mod sim;

/// Pulse-generator bank. Channels are claimed from the primary bank
/// first, falling back to the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseBank {
    /// First pulse-generator bank.
    Primary,
    /// Second pulse-generator bank.
    Secondary,
}

/// One claimed pulse-generator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseChannel {
    /// Bank the channel belongs to.
    pub bank: PulseBank,
    /// Channel index within the bank.
    pub index: u8,
}

/// One claimed bulk-transfer channel.
///
/// The raw index doubles as the bit position in the completion bitmask
/// returned by [`StepperBackend::take_completions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BurstChannel(pub u8);

/// Pulse-generation program variants, selected by motor wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WiringProgram {
    /// STEP/DIR driver, step pin below dir pin.
    TwoWire,
    /// STEP/DIR driver with the pin order reversed.
    TwoWireReversed,
    /// Direct four-coil drive.
    FourWire,
}

/// Capability surface of the step-streaming hardware.
///
/// Implementations own channel bookkeeping and the peripheral
/// registers. The contract mirrors the hardware: a transfer channel
/// replays one control word per beat from a fixed source, raises one
/// completion per finished burst, and buffers at most one in-flight
/// transfer per channel.
pub trait StepperBackend {
    /// Claim a free pulse-generator channel from the given bank.
    fn claim_pulse_channel(&mut self, bank: PulseBank) -> Option<PulseChannel>;

    /// Claim a free bulk-transfer channel.
    fn claim_burst_channel(&mut self) -> Option<BurstChannel>;

    /// Bind a transfer channel to feed a pulse channel's input register:
    /// fixed 32-bit transfer width, source address not auto-incremented,
    /// completion raising the shared completion signal.
    fn bind_burst_channel(&mut self, burst: BurstChannel, pulse: PulseChannel);

    /// Load a wiring program onto a pulse channel and start it at the
    /// given base pin and clock divider. Programs are not reconfigured
    /// after load.
    fn install_program(
        &mut self,
        pulse: PulseChannel,
        program: WiringProgram,
        base_pin: u8,
        clock_div: u32,
    );

    /// Publish the control word the transfer channel replays on every
    /// beat. Updating it mid-burst takes effect on the next pulse.
    fn write_command(&mut self, burst: BurstChannel, word: u32);

    /// Arm and start a burst of `steps` repetitions of the current
    /// control word. Returns immediately; the hardware runs in parallel.
    fn start_burst(&mut self, burst: BurstChannel, steps: u32);

    /// Push one control word directly into the pulse channel's input
    /// queue, busy-waiting while the queue is full.
    fn push_blocking(&mut self, pulse: PulseChannel, word: u32);

    /// True once the pulse channel's input queue has drained.
    fn tx_queue_empty(&self, pulse: PulseChannel) -> bool;

    /// Read and atomically clear the completed-transfer bitmask. Bit
    /// `n` corresponds to `BurstChannel(n)`.
    fn take_completions(&mut self) -> u32;
}
