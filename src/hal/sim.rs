//! Host-side simulation backend.
//!
//! Models the channel pool and the transfer contract without any
//! hardware: a started burst completes on the next call to
//! [`StepperBackend::take_completions`]. Every burst, streamed word and
//! installed program is recorded so tests can assert on the exact
//! traffic the controller generated.

use crate::device::NUM_BURST_CHANNELS;

use super::{BurstChannel, PulseBank, PulseChannel, StepperBackend, WiringProgram};

/// Channels per pulse-generator bank.
const CHANNELS_PER_BANK: u8 = 4;

/// One burst as observed at the hardware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstRecord {
    /// Transfer channel the burst ran on.
    pub channel: u8,
    /// Number of control-word repetitions.
    pub steps: u32,
    /// Control word in effect when the burst was armed.
    pub command: u32,
}

/// One installed pulse-generation program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledProgram {
    /// Channel the program was loaded onto.
    pub channel: PulseChannel,
    /// Selected wiring variant.
    pub program: WiringProgram,
    /// Base pin the program drives.
    pub base_pin: u8,
    /// Clock divider.
    pub clock_div: u32,
}

/// In-memory [`StepperBackend`] for tests and host-side bring-up.
#[derive(Debug, Default)]
pub struct SimBackend {
    claimed_primary: u8,
    claimed_secondary: u8,
    claimed_bursts: u8,
    commands: [u32; NUM_BURST_CHANNELS],
    bindings: [Option<PulseChannel>; NUM_BURST_CHANNELS],
    in_flight: u32,
    /// Every burst started, in dispatch order.
    pub bursts: Vec<BurstRecord>,
    /// Every word streamed through the blocking path, in order.
    pub streamed: Vec<u32>,
    /// Every program installed, in order.
    pub programs: Vec<InstalledProgram>,
}

impl SimBackend {
    /// Create an empty simulation backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bursts recorded so far.
    pub fn burst_count(&self) -> usize {
        self.bursts.len()
    }

    /// Total steps dispatched on one transfer channel.
    pub fn steps_on(&self, channel: BurstChannel) -> u64 {
        self.bursts
            .iter()
            .filter(|b| b.channel == channel.0)
            .map(|b| b.steps as u64)
            .sum()
    }

    /// Burst records for one transfer channel, in dispatch order.
    pub fn bursts_on(&self, channel: BurstChannel) -> impl Iterator<Item = &BurstRecord> {
        self.bursts.iter().filter(move |b| b.channel == channel.0)
    }

    /// Control word currently published on one transfer channel. This
    /// is the word an in-flight burst would replay on its next beat.
    pub fn current_command(&self, channel: BurstChannel) -> u32 {
        self.commands[channel.0 as usize]
    }
}

impl StepperBackend for SimBackend {
    fn claim_pulse_channel(&mut self, bank: PulseBank) -> Option<PulseChannel> {
        let claimed = match bank {
            PulseBank::Primary => &mut self.claimed_primary,
            PulseBank::Secondary => &mut self.claimed_secondary,
        };
        if *claimed >= CHANNELS_PER_BANK {
            return None;
        }
        let index = *claimed;
        *claimed += 1;
        Some(PulseChannel { bank, index })
    }

    fn claim_burst_channel(&mut self) -> Option<BurstChannel> {
        if (self.claimed_bursts as usize) >= NUM_BURST_CHANNELS {
            return None;
        }
        let channel = BurstChannel(self.claimed_bursts);
        self.claimed_bursts += 1;
        Some(channel)
    }

    fn bind_burst_channel(&mut self, burst: BurstChannel, pulse: PulseChannel) {
        self.bindings[burst.0 as usize] = Some(pulse);
    }

    fn install_program(
        &mut self,
        pulse: PulseChannel,
        program: WiringProgram,
        base_pin: u8,
        clock_div: u32,
    ) {
        self.programs.push(InstalledProgram {
            channel: pulse,
            program,
            base_pin,
            clock_div,
        });
    }

    fn write_command(&mut self, burst: BurstChannel, word: u32) {
        self.commands[burst.0 as usize] = word;
    }

    fn start_burst(&mut self, burst: BurstChannel, steps: u32) {
        self.bursts.push(BurstRecord {
            channel: burst.0,
            steps,
            command: self.commands[burst.0 as usize],
        });
        self.in_flight |= 1 << burst.0;
    }

    fn push_blocking(&mut self, _pulse: PulseChannel, word: u32) {
        self.streamed.push(word);
    }

    fn tx_queue_empty(&self, _pulse: PulseChannel) -> bool {
        true
    }

    fn take_completions(&mut self) -> u32 {
        core::mem::take(&mut self.in_flight)
    }
}
