//! Single-axis trapezoidal position moves.
//!
//! A move is split into fixed-size slices. Each acceleration slice is
//! one async burst whose completion drives one ramp adjustment; the
//! delay in effect before each adjustment is pushed to the device's
//! ramp stack, and deceleration pops those values back so the
//! down-ramp retraces the up-ramp exactly. Slices spent pinned at the
//! speed cap are counted instead of pushed and unwound as coasting.

use embedded_hal::delay::DelayNs;

use crate::device::{DeviceId, RampDirection};
use crate::error::Result;
use crate::hal::StepperBackend;
use crate::motion::{CompletionAction, MotionController};
use crate::timing::{delay_to_speed, speed_to_delay, NUM_SLICE_STEPS};

impl<B, D> MotionController<B, D>
where
    B: StepperBackend,
    D: DelayNs,
{
    /// Move one axis to an absolute position with a trapezoidal ramp,
    /// blocking until the move is physically complete.
    ///
    /// The tracked position is updated optimistically at dispatch;
    /// callers must not read it as in-flight progress. Moving to the
    /// current position is a successful no-op with zero hardware
    /// dispatches.
    pub fn move_to_position(&mut self, id: DeviceId, target: i32) -> Result<()> {
        let (steps, direction) = {
            let device = self.registry.get_mut(id)?;
            let steps = target.wrapping_sub(device.position).unsigned_abs();
            let direction = target > device.position;

            // Fresh ramp state; nothing from a prior move may leak in.
            device.position = target;
            device.coasting_slices = 0;
            device.moving_acceleration = device.acceleration;
            device.ramp.clear();
            let min_speed = device.min_speed;
            device.apply_delay(speed_to_delay(min_speed));
            (steps, direction)
        };
        self.set_direction(id, direction)?;
        self.publish(id)?;

        let slices = steps / NUM_SLICE_STEPS;

        // Accelerate for the first half of the slices.
        self.registry.get_mut(id)?.ramp_direction = RampDirection::Up;
        for _ in 0..slices / 2 {
            self.move_async(id, NUM_SLICE_STEPS, CompletionAction::Ramp)?;
            self.wait_idle(id);
        }

        // Steps that prevent an even split coast at the current speed.
        self.registry.get_mut(id)?.ramp_direction = RampDirection::Hold;
        if steps % NUM_SLICE_STEPS > 0 {
            self.move_async(id, steps % NUM_SLICE_STEPS, CompletionAction::None)?;
            self.wait_idle(id);
        }

        // Decelerate mirroring the acceleration half.
        self.registry.get_mut(id)?.ramp_direction = RampDirection::Down;
        for _ in 0..slices / 2 {
            self.move_async(id, NUM_SLICE_STEPS, CompletionAction::Ramp)?;
            self.wait_idle(id);
        }

        Ok(())
    }

    /// One ramp adjustment, run on completion of each ramp slice.
    pub(crate) fn advance_ramp(&mut self, id: DeviceId) {
        let Ok(device) = self.registry.get_mut(id) else {
            return;
        };
        if device.moving_acceleration == 0 {
            return;
        }
        match device.ramp_direction {
            RampDirection::Hold => return,
            RampDirection::Down => {
                // Unwind capped slices first, then replay the recorded
                // ramp verbatim. An exhausted stack keeps the delay.
                let next = if device.coasting_slices > 0 {
                    device.coasting_slices -= 1;
                    device.delay
                } else {
                    device.ramp.pop().unwrap_or(device.delay)
                };
                device.apply_delay(next);
            }
            RampDirection::Up => {
                let init_delay = device.delay;
                let speed = delay_to_speed(init_delay);

                // Speed gained over the time this slice takes at the
                // current speed.
                let slice_time = NUM_SLICE_STEPS as f64 / speed as f64;
                let projected =
                    speed.saturating_add((device.moving_acceleration as f64 * slice_time) as u32);

                let mut next = speed_to_delay(projected);
                if next == init_delay {
                    // Rounding stalled; force monotonic progress.
                    next = init_delay.saturating_sub(1);
                }
                let floor = speed_to_delay(device.max_speed);
                next = next.max(floor);

                if next == floor {
                    // At the speed cap: count the slice as coasting so
                    // deceleration skips an equal number of pops.
                    device.coasting_slices += 1;
                } else if device.ramp.push(init_delay).is_err() {
                    // Stack full: hold the delay and record a coast so
                    // the mirror stays exact at capacity.
                    device.coasting_slices += 1;
                    next = init_delay;
                }
                device.apply_delay(next);
            }
        }
        // The device was fetched above, so its channel is bound; write
        // the recomputed word straight to it rather than re-resolving.
        let burst = device.burst;
        let command = device.command;
        if let Some(burst) = burst {
            self.backend.write_command(burst, command);
        }
    }
}
