//! Motion controller: allocation, command setters, the async step
//! engine and completion dispatch.
//!
//! The controller is the explicit context object owning the device
//! registry and the hardware backend. Concurrency comes from the
//! hardware channels running in real time between a burst dispatch and
//! the matching join; software stays single-writer per device because
//! `running` is cleared exactly once per burst and the next burst is
//! only dispatched after observing it cleared.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::command::{ControlWord, DELAY_MAX, DIR_POLARITY};
use crate::config::{AxisConfig, SystemConfig};
use crate::device::{DeviceId, DeviceRegistry, RampDirection};
use crate::error::{ConfigError, Error, Result};
use crate::hal::{PulseBank, StepperBackend, WiringProgram};
use crate::timing::{speed_to_delay, CLOCK_DIV, COMPLETION_POLL_US};

/// What to do when a burst completes.
///
/// The same slot serves the internal ramp driver and user callbacks,
/// so it is a tagged enum rather than a bare function pointer.
pub enum CompletionAction<B, D> {
    /// Nothing; the device just stops.
    None,
    /// Drive the next slice of the acceleration ramp.
    Ramp,
    /// Invoke a user callback. The callback may re-enter
    /// [`MotionController::move_async`] for continuous stepping.
    User(fn(&mut MotionController<B, D>, DeviceId)),
}

impl<B, D> Clone for CompletionAction<B, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, D> Copy for CompletionAction<B, D> {}

impl<B, D> fmt::Debug for CompletionAction<B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionAction::None => f.write_str("None"),
            CompletionAction::Ramp => f.write_str("Ramp"),
            CompletionAction::User(_) => f.write_str("User"),
        }
    }
}

/// Multi-axis stepper motion controller.
///
/// Generic over:
/// - `B`: hardware backend (must implement [`StepperBackend`])
/// - `D`: yield provider for polling loops (must implement [`DelayNs`])
pub struct MotionController<B, D> {
    pub(crate) backend: B,
    idle_delay: D,
    pub(crate) registry: DeviceRegistry<B, D>,
}

impl<B, D> MotionController<B, D>
where
    B: StepperBackend,
    D: DelayNs,
{
    /// Create a controller over a backend and a polling-yield provider.
    pub fn new(backend: B, idle_delay: D) -> Self {
        Self {
            backend,
            idle_delay,
            registry: DeviceRegistry::new(),
        }
    }

    /// Borrow the hardware backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the hardware backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of claimed device slots.
    pub fn device_count(&self) -> usize {
        self.registry.claimed_count()
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Claim a device slot and hardware channels for one axis, loading
    /// the given wiring program at `base_pin`.
    ///
    /// Fails with [`Error::ResourceExhausted`] when no slot, pulse
    /// channel or transfer channel is free; the registry is left
    /// unchanged on failure.
    pub fn claim_axis(&mut self, base_pin: u8, wiring: WiringProgram) -> Result<DeviceId> {
        self.claim_resources(wiring, base_pin)
    }

    /// Claim an axis from explicit direction/step pins.
    ///
    /// The smaller pin number is treated as the step pin: if
    /// `dir_pin > step_pin` the two-wire program starts at `step_pin`,
    /// otherwise the reversed-wiring variant starts at `dir_pin`.
    pub fn claim_axis_with_pins(&mut self, dir_pin: u8, step_pin: u8) -> Result<DeviceId> {
        let (program, base_pin) = if dir_pin > step_pin {
            (WiringProgram::TwoWire, step_pin)
        } else {
            (WiringProgram::TwoWireReversed, dir_pin)
        };
        self.claim_axis(base_pin, program)
    }

    /// Claim an axis described by a named configuration entry and apply
    /// its speed, acceleration and enable settings.
    pub fn claim_axis_from_config(
        &mut self,
        config: &SystemConfig,
        name: &str,
    ) -> Result<DeviceId> {
        let axis = config.axis(name).ok_or_else(|| {
            ConfigError::AxisNotFound(heapless::String::try_from(name).unwrap_or_default())
        })?;
        axis.validate()?;

        let id = match (axis.dir_pin, axis.step_pin) {
            (Some(dir), Some(step)) => self.claim_axis_with_pins(dir, step)?,
            _ => {
                // validate() guarantees base_pin and wiring are present here
                let base = axis.base_pin.ok_or(Error::InvalidDevice)?;
                let wiring = axis.wiring.ok_or(Error::InvalidDevice)?;
                self.claim_axis(base, wiring)?
            }
        };
        self.apply_axis_config(id, axis)?;
        Ok(id)
    }

    fn apply_axis_config(&mut self, id: DeviceId, axis: &AxisConfig) -> Result<()> {
        self.set_max_speed(id, axis.max_speed)?;
        self.set_min_speed(id, axis.min_speed)?;
        self.set_acceleration(id, axis.acceleration)?;
        self.set_enabled(id, axis.enabled)
    }

    fn claim_resources(&mut self, program: WiringProgram, base_pin: u8) -> Result<DeviceId> {
        let id = self.registry.free_slot().ok_or(Error::ResourceExhausted)?;
        let pulse = self
            .backend
            .claim_pulse_channel(PulseBank::Primary)
            .or_else(|| self.backend.claim_pulse_channel(PulseBank::Secondary))
            .ok_or(Error::ResourceExhausted)?;
        let burst = self
            .backend
            .claim_burst_channel()
            .ok_or(Error::ResourceExhausted)?;

        self.backend.bind_burst_channel(burst, pulse);
        self.backend.install_program(pulse, program, base_pin, CLOCK_DIV);
        self.registry.attach(id, pulse, burst);
        self.publish(id)?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Configuration setters
    // ------------------------------------------------------------------

    /// Set the stepping direction. Safe mid-move: the updated control
    /// word reaches the hardware on the next pulse.
    pub fn set_direction(&mut self, id: DeviceId, direction: bool) -> Result<()> {
        let device = self.registry.get_mut(id)?;
        device.direction = direction ^ DIR_POLARITY;
        device.recompute_command();
        self.publish(id)
    }

    /// Enable or disable step output. Safe mid-move.
    pub fn set_enabled(&mut self, id: DeviceId, enabled: bool) -> Result<()> {
        let device = self.registry.get_mut(id)?;
        device.enabled = enabled;
        device.recompute_command();
        self.publish(id)
    }

    /// Set the inter-step delay, clamped to the representable range.
    /// Safe mid-move; this is the live speed-tuning mechanism.
    pub fn set_delay(&mut self, id: DeviceId, delay: u32) -> Result<()> {
        self.registry.get_mut(id)?.apply_delay(delay);
        self.publish(id)
    }

    /// Set the stepping speed in steps/sec (sugar over [`set_delay`]).
    ///
    /// [`set_delay`]: MotionController::set_delay
    pub fn set_speed(&mut self, id: DeviceId, rate: u32) -> Result<()> {
        self.set_delay(id, speed_to_delay(rate))
    }

    /// Set the acceleration rate used by position moves, in
    /// steps/sec².
    pub fn set_acceleration(&mut self, id: DeviceId, acceleration: u32) -> Result<()> {
        self.registry.get_mut(id)?.acceleration = acceleration;
        Ok(())
    }

    /// Overwrite the software-tracked position.
    pub fn set_position(&mut self, id: DeviceId, position: i32) -> Result<()> {
        self.registry.get_mut(id)?.position = position;
        Ok(())
    }

    /// Set the speed cap position moves accelerate towards.
    pub fn set_max_speed(&mut self, id: DeviceId, speed: u32) -> Result<()> {
        self.registry.get_mut(id)?.max_speed = speed;
        Ok(())
    }

    /// Set the speed position moves start from, and adopt its delay
    /// immediately.
    pub fn set_min_speed(&mut self, id: DeviceId, speed: u32) -> Result<()> {
        let device = self.registry.get_mut(id)?;
        device.min_speed = speed;
        device.apply_delay(speed_to_delay(speed));
        self.publish(id)
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    /// Software-tracked position. Updated optimistically at move
    /// dispatch, so it does not reflect in-flight motion.
    pub fn position(&self, id: DeviceId) -> Result<i32> {
        Ok(self.registry.get(id)?.position)
    }

    /// True while an async transfer is outstanding.
    pub fn is_running(&self, id: DeviceId) -> Result<bool> {
        Ok(self.registry.get(id)?.running)
    }

    /// Current enable flag.
    pub fn enabled(&self, id: DeviceId) -> Result<bool> {
        Ok(self.registry.get(id)?.enabled)
    }

    /// Current inter-step delay.
    pub fn delay(&self, id: DeviceId) -> Result<u32> {
        Ok(self.registry.get(id)?.delay)
    }

    /// Configured acceleration rate.
    pub fn acceleration(&self, id: DeviceId) -> Result<u32> {
        Ok(self.registry.get(id)?.acceleration)
    }

    // ------------------------------------------------------------------
    // Async step engine
    // ------------------------------------------------------------------

    /// Start a non-blocking burst of `steps` repetitions of the current
    /// control word and return immediately.
    ///
    /// Fails with [`Error::AlreadyRunning`] mid-transfer and with
    /// [`Error::InvalidDevice`] for unclaimed handles; on failure the
    /// callback, running flag and transfer configuration are untouched.
    pub fn move_async(
        &mut self,
        id: DeviceId,
        steps: u32,
        action: CompletionAction<B, D>,
    ) -> Result<()> {
        let device = self.registry.get_mut(id)?;
        if device.running {
            return Err(Error::AlreadyRunning);
        }
        if !device.configured {
            return Err(Error::InvalidDevice);
        }
        // Delay zero means "never set"; fall back to the minimum speed.
        if device.delay == 0 {
            let min_speed = device.min_speed;
            device.apply_delay(speed_to_delay(min_speed));
        }
        device.callback = action;
        let burst = device.burst.ok_or(Error::InvalidDevice)?;
        let command = device.command;
        device.running = true;

        self.backend.write_command(burst, command);
        self.backend.start_burst(burst, steps);
        Ok(())
    }

    /// Stream `steps` individually computed control words with a linear
    /// delay ramp, blocking until the pulse queue drains.
    ///
    /// `start_delay` grows by `delay_step` per step; the caller must
    /// pick a sign and magnitude that avoid wrap-around. This path
    /// bypasses completion dispatch entirely.
    pub fn move_blocking(
        &mut self,
        id: DeviceId,
        steps: u32,
        direction: bool,
        start_delay: u32,
        delay_step: i32,
    ) -> Result<()> {
        if start_delay > DELAY_MAX {
            return Err(Error::DelayOutOfRange(start_delay));
        }
        let device = self.registry.get_mut(id)?;
        if device.running {
            return Err(Error::AlreadyRunning);
        }
        let pulse = device.pulse.ok_or(Error::InvalidDevice)?;
        device.running = true;

        let mut delay = start_delay;
        for _ in 0..steps {
            let word = ControlWord::encode(delay, direction ^ DIR_POLARITY, true);
            self.backend.push_blocking(pulse, word.raw());
            delay = delay.wrapping_add_signed(delay_step);
        }
        while !self.backend.tx_queue_empty(pulse) {
            core::hint::spin_loop();
        }

        self.registry.get_mut(id)?.running = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Completion dispatch
    // ------------------------------------------------------------------

    /// Completion dispatch entry point, shared by all devices.
    ///
    /// Reads and clears the completed-channel bitmask, resolves each
    /// set bit to its device through the registry map, clears the
    /// device's running flag and runs its completion action. One
    /// hardware completion is exactly one dispatch per channel.
    ///
    /// On an embedded target this is called from the shared transfer
    /// interrupt; host code calls it from the polling loops.
    pub fn service_completions(&mut self) {
        let mut pending = self.backend.take_completions();
        while pending != 0 {
            let channel = pending.trailing_zeros() as usize;
            pending &= pending - 1;

            let Some(id) = self.registry.owner_of(channel) else {
                continue;
            };
            let action = match self.registry.get_mut(id) {
                Ok(device) => {
                    device.running = false;
                    device.callback
                }
                Err(_) => continue,
            };
            match action {
                CompletionAction::None => {}
                CompletionAction::Ramp => self.advance_ramp(id),
                CompletionAction::User(callback) => callback(self, id),
            }
        }
    }

    /// Block until the device's outstanding transfer completes.
    ///
    /// This is the single internal wait primitive: an unbounded poll
    /// with no timeout. A transfer that never completes hangs the
    /// caller; a future revision may add a timeout here without
    /// changing the call sites' meaning.
    pub fn wait_idle(&mut self, id: DeviceId) {
        loop {
            match self.registry.get(id) {
                Ok(device) if device.running => {}
                _ => return,
            }
            self.service_completions();
            self.idle_delay.delay_us(COMPLETION_POLL_US);
        }
    }

    /// Push the device's current control word to its transfer channel.
    pub(crate) fn publish(&mut self, id: DeviceId) -> Result<()> {
        let (burst, command) = {
            let device = self.registry.get(id)?;
            (device.burst.ok_or(Error::InvalidDevice)?, device.command)
        };
        self.backend.write_command(burst, command);
        Ok(())
    }
}
