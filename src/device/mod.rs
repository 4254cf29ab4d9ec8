//! Device slots and the fixed-capacity registry.
//!
//! One device is one claimed stepper axis: its configuration, motion
//! state, claimed channels and delay-replay stack. The registry owns
//! the slot pool and the transfer-channel → slot mapping used by
//! completion dispatch.

mod ramp_stack;

pub use ramp_stack::{RampStack, RAMP_DEPTH};

use crate::command::ControlWord;
use crate::error::{Error, Result};
use crate::hal::{BurstChannel, PulseChannel};
use crate::motion::CompletionAction;

/// Number of device slots in the registry.
pub const MAX_DEVICES: usize = 8;

/// Number of bulk-transfer channels the completion map covers.
pub const NUM_BURST_CHANNELS: usize = 12;

/// Handle to one claimed device slot.
///
/// Stable for the device's lifetime. The reserved [`DeviceId::INVALID`]
/// sentinel is rejected by every operation without touching hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(u8);

impl DeviceId {
    /// Reserved out-of-range handle; always rejected.
    pub const INVALID: Self = Self(u8::MAX);

    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Slot index behind this handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which way the ramp is being driven between slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampDirection {
    /// Replaying the recorded ramp in reverse (decelerating).
    Down,
    /// Holding the current delay (coasting).
    #[default]
    Hold,
    /// Shortening the delay each slice (accelerating).
    Up,
}

/// State of one claimed stepper axis.
///
/// Generic over the backend and delay provider only because the
/// completion action may carry a user callback into the owning
/// controller.
pub(crate) struct Device<B, D> {
    pub(crate) configured: bool,
    pub(crate) running: bool,
    pub(crate) enabled: bool,
    /// Direction with wiring polarity already applied.
    pub(crate) direction: bool,
    pub(crate) delay: u32,
    /// Encoding of (delay, direction, enabled); recomputed on every
    /// configuration change, never stale.
    pub(crate) command: u32,
    /// Software-tracked position; not read back from hardware.
    pub(crate) position: i32,
    pub(crate) min_speed: u32,
    pub(crate) max_speed: u32,
    pub(crate) acceleration: u32,
    pub(crate) moving_acceleration: u32,
    pub(crate) ramp_direction: RampDirection,
    pub(crate) coasting_slices: u32,
    pub(crate) pulse: Option<PulseChannel>,
    pub(crate) burst: Option<BurstChannel>,
    pub(crate) callback: CompletionAction<B, D>,
    pub(crate) ramp: RampStack,
}

impl<B, D> Device<B, D> {
    fn unclaimed() -> Self {
        Self {
            configured: false,
            running: false,
            enabled: false,
            direction: true,
            delay: 1,
            command: 0,
            position: 0,
            min_speed: 0,
            max_speed: 0,
            acceleration: 0,
            moving_acceleration: 0,
            ramp_direction: RampDirection::Hold,
            coasting_slices: 0,
            pulse: None,
            burst: None,
            callback: CompletionAction::None,
            ramp: RampStack::new(),
        }
    }

    /// Recompute the cached control word from the current fields.
    pub(crate) fn recompute_command(&mut self) {
        self.command = ControlWord::encode(self.delay, self.direction, self.enabled).raw();
    }

    /// Clamp and store a new delay, keeping the command word current.
    pub(crate) fn apply_delay(&mut self, delay: u32) {
        self.delay = delay
            .max(crate::timing::MIN_DELAY)
            .min(crate::command::DELAY_MAX);
        self.recompute_command();
    }
}

/// Fixed pool of device slots plus the completion-channel mapping.
pub(crate) struct DeviceRegistry<B, D> {
    devices: [Device<B, D>; MAX_DEVICES],
    in_use: [bool; MAX_DEVICES],
    burst_owner: [Option<DeviceId>; NUM_BURST_CHANNELS],
}

impl<B, D> DeviceRegistry<B, D> {
    pub(crate) fn new() -> Self {
        Self {
            devices: core::array::from_fn(|_| Device::unclaimed()),
            in_use: [false; MAX_DEVICES],
            burst_owner: [None; NUM_BURST_CHANNELS],
        }
    }

    /// First unclaimed slot, if any. Does not modify the registry.
    pub(crate) fn free_slot(&self) -> Option<DeviceId> {
        self.in_use
            .iter()
            .position(|used| !used)
            .map(|i| DeviceId::new(i as u8))
    }

    /// Mark a slot claimed and bind its channels. Called once per
    /// device, after all hardware resources were acquired.
    pub(crate) fn attach(&mut self, id: DeviceId, pulse: PulseChannel, burst: BurstChannel) {
        let idx = id.index();
        self.in_use[idx] = true;
        let device = &mut self.devices[idx];
        device.pulse = Some(pulse);
        device.burst = Some(burst);
        device.configured = true;
        device.running = false;
        device.recompute_command();
        self.burst_owner[burst.0 as usize] = Some(id);
    }

    /// Resolve a completed transfer channel back to its device.
    pub(crate) fn owner_of(&self, channel: usize) -> Option<DeviceId> {
        if channel < NUM_BURST_CHANNELS {
            self.burst_owner[channel]
        } else {
            None
        }
    }

    pub(crate) fn get(&self, id: DeviceId) -> Result<&Device<B, D>> {
        let idx = id.index();
        if idx < MAX_DEVICES && self.in_use[idx] {
            Ok(&self.devices[idx])
        } else {
            Err(Error::InvalidDevice)
        }
    }

    pub(crate) fn get_mut(&mut self, id: DeviceId) -> Result<&mut Device<B, D>> {
        let idx = id.index();
        if idx < MAX_DEVICES && self.in_use[idx] {
            Ok(&mut self.devices[idx])
        } else {
            Err(Error::InvalidDevice)
        }
    }

    pub(crate) fn claimed_count(&self) -> usize {
        self.in_use.iter().filter(|&&used| used).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PulseBank;

    type Registry = DeviceRegistry<(), ()>;

    #[test]
    fn test_invalid_sentinel_rejected() {
        let registry = Registry::new();
        assert_eq!(registry.get(DeviceId::INVALID).err(), Some(Error::InvalidDevice));
    }

    #[test]
    fn test_unclaimed_slot_rejected() {
        let registry = Registry::new();
        assert_eq!(registry.get(DeviceId::new(0)).err(), Some(Error::InvalidDevice));
    }

    #[test]
    fn test_attach_and_lookup() {
        let mut registry = Registry::new();
        let id = registry.free_slot().unwrap();
        let pulse = PulseChannel { bank: PulseBank::Primary, index: 0 };
        registry.attach(id, pulse, BurstChannel(3));

        assert!(registry.get(id).is_ok());
        assert_eq!(registry.owner_of(3), Some(id));
        assert_eq!(registry.owner_of(4), None);
        assert_eq!(registry.owner_of(NUM_BURST_CHANNELS), None);
        assert_eq!(registry.claimed_count(), 1);
    }

    #[test]
    fn test_slots_exhaust() {
        let mut registry = Registry::new();
        for i in 0..MAX_DEVICES {
            let id = registry.free_slot().unwrap();
            assert_eq!(id.index(), i);
            let pulse = PulseChannel { bank: PulseBank::Primary, index: i as u8 };
            registry.attach(id, pulse, BurstChannel(i as u8));
        }
        assert!(registry.free_slot().is_none());
        assert_eq!(registry.claimed_count(), MAX_DEVICES);
    }

    #[test]
    fn test_command_recomputed_on_delay() {
        let mut device: Device<(), ()> = Device::unclaimed();
        device.enabled = true;
        device.apply_delay(500);
        let word = ControlWord::from_raw(device.command);
        assert_eq!(word.delay(), 500);
        assert!(word.direction());
        assert!(word.enabled());
    }
}
