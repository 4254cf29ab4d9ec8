//! Multi-axis synchronized position moves.
//!
//! All axes finish together: each axis's acceleration and per-slice
//! step count scale with its share of the longest distance, so every
//! axis reaches cruise speed, coasts and slows over the same slices.

use embedded_hal::delay::DelayNs;

use heapless::Vec;

use crate::device::{DeviceId, RampDirection, MAX_DEVICES};
use crate::error::{Error, Result};
use crate::hal::StepperBackend;
use crate::motion::{CompletionAction, MotionController};
use crate::timing::{speed_to_delay, MIN_SLICE_STEPS, NUM_SLICE_STEPS};

impl<B, D> MotionController<B, D>
where
    B: StepperBackend,
    D: DelayNs,
{
    /// Move several axes to absolute positions so they complete
    /// simultaneously, blocking until every axis is done.
    ///
    /// With `sequential` set, axes time-share within each slice (each
    /// burst is awaited before the next axis dispatches); without it,
    /// all axes of a slice run concurrently and are joined afterwards.
    ///
    /// Returns successfully with zero hardware activity when every
    /// axis is already at its target.
    pub fn move_to_positions(
        &mut self,
        ids: &[DeviceId],
        targets: &[i32],
        sequential: bool,
    ) -> Result<()> {
        if ids.is_empty() || ids.len() != targets.len() || ids.len() > MAX_DEVICES {
            return Err(Error::InvalidDevice);
        }
        let mut needs_move = false;
        for (&id, &target) in ids.iter().zip(targets) {
            needs_move |= target != self.registry.get(id)?.position;
        }
        if !needs_move {
            return Ok(());
        }

        // Per-axis direction and distance, tracked position updated
        // optimistically, ramp state reset.
        let mut distances: Vec<u32, MAX_DEVICES> = Vec::new();
        let mut remaining: Vec<i64, MAX_DEVICES> = Vec::new();
        let mut most_steps: u32 = 0;
        let mut any_zero_accel = false;
        for (&id, &target) in ids.iter().zip(targets) {
            let (distance, direction) = {
                let device = self.registry.get_mut(id)?;
                let distance = target.wrapping_sub(device.position).unsigned_abs();
                let direction = target > device.position;
                device.position = target;
                device.coasting_slices = 0;
                device.ramp.clear();
                let min_speed = device.min_speed;
                device.apply_delay(speed_to_delay(min_speed));
                any_zero_accel |= device.acceleration == 0;
                (distance, direction)
            };
            self.set_direction(id, direction)?;
            let _ = distances.push(distance);
            let _ = remaining.push(distance as i64);
            most_steps = most_steps.max(distance);
        }

        // One coast, no ramp, when any axis cannot accelerate.
        let acceleration_steps = if any_zero_accel {
            0
        } else {
            most_steps / NUM_SLICE_STEPS
        };

        // Shorter axes ramp proportionally gentler so all axes reach
        // cruise speed together.
        let mut per_slice: Vec<u32, MAX_DEVICES> = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            let device = self.registry.get_mut(id)?;
            device.moving_acceleration =
                ((device.acceleration as f64 * distances[i] as f64) / most_steps as f64) as u32;
            device.ramp_direction = RampDirection::Up;
            let share = if acceleration_steps > 0 {
                distances[i] / acceleration_steps
            } else {
                0
            };
            let _ = per_slice.push(share);
        }

        // Accelerate for the first half of the slices. Axes whose
        // share is too small to burst bank those steps for the coast.
        for _ in 0..acceleration_steps / 2 {
            for (i, &id) in ids.iter().enumerate() {
                if per_slice[i] > MIN_SLICE_STEPS {
                    self.move_async(id, per_slice[i], CompletionAction::Ramp)?;
                    remaining[i] -= per_slice[i] as i64 * 2;
                } else {
                    remaining[i] += per_slice[i] as i64 * 2;
                }
                if sequential {
                    self.wait_idle(id);
                }
            }
            if !sequential {
                self.join_all(ids);
            }
        }

        // Consume whatever an even split left over, coasting.
        for (i, &id) in ids.iter().enumerate() {
            self.registry.get_mut(id)?.ramp_direction = RampDirection::Hold;
            if remaining[i] > 0 {
                self.move_async(id, remaining[i] as u32, CompletionAction::None)?;
            }
            if sequential {
                self.wait_idle(id);
            }
        }
        if !sequential {
            self.join_all(ids);
        }

        // Decelerate mirroring the acceleration half.
        for &id in ids {
            self.registry.get_mut(id)?.ramp_direction = RampDirection::Down;
        }
        for _ in 0..acceleration_steps / 2 {
            for (i, &id) in ids.iter().enumerate() {
                if per_slice[i] > MIN_SLICE_STEPS {
                    self.move_async(id, per_slice[i], CompletionAction::Ramp)?;
                }
                if sequential {
                    self.wait_idle(id);
                }
            }
            if !sequential {
                self.join_all(ids);
            }
        }

        Ok(())
    }

    fn join_all(&mut self, ids: &[DeviceId]) {
        for &id in ids {
            self.wait_idle(id);
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::hal::sim::SimBackend;
    use crate::hal::BurstChannel;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn two_axis_rig() -> (MotionController<SimBackend, NoopDelay>, DeviceId, DeviceId) {
        let mut ctl = MotionController::new(SimBackend::new(), NoopDelay);
        let a = ctl.claim_axis_with_pins(21, 20).unwrap();
        let b = ctl.claim_axis_with_pins(18, 19).unwrap();
        for id in [a, b] {
            ctl.set_enabled(id, true).unwrap();
            ctl.set_max_speed(id, 60_000).unwrap();
            ctl.set_min_speed(id, 10_000).unwrap();
            ctl.set_acceleration(id, 200_000).unwrap();
        }
        (ctl, a, b)
    }

    #[test]
    fn test_all_axes_at_target_is_noop() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.move_to_positions(&[a, b], &[0, 0], false).unwrap();
        assert_eq!(ctl.backend().burst_count(), 0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let (mut ctl, a, b) = two_axis_rig();
        assert_eq!(
            ctl.move_to_positions(&[a, b], &[100], false).err(),
            Some(Error::InvalidDevice)
        );
        assert_eq!(ctl.move_to_positions(&[], &[], false).err(), Some(Error::InvalidDevice));
        assert_eq!(ctl.backend().burst_count(), 0);
    }

    #[test]
    fn test_both_axes_reach_targets() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.move_to_positions(&[a, b], &[4000, 2000], false).unwrap();

        assert_eq!(ctl.position(a).unwrap(), 4000);
        assert_eq!(ctl.position(b).unwrap(), 2000);
        assert!(!ctl.is_running(a).unwrap());
        assert!(!ctl.is_running(b).unwrap());
        assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 4000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 2000);
    }

    #[test]
    fn test_per_slice_counts_scale_with_distance() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.move_to_positions(&[a, b], &[4000, 2000], false).unwrap();

        // most_steps = 4000, 40 ramp slices: axis a bursts 100 steps
        // per slice, axis b 50, a 2:1 ratio matching the distances.
        let a_slice = ctl.backend().bursts_on(BurstChannel(0)).next().unwrap().steps;
        let b_slice = ctl.backend().bursts_on(BurstChannel(1)).next().unwrap().steps;
        assert_eq!(a_slice, 100);
        assert_eq!(b_slice, 50);
        assert_eq!(a_slice / b_slice, 2);
    }

    #[test]
    fn test_proportional_acceleration() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.move_to_positions(&[a, b], &[4000, 2000], false).unwrap();

        // The shorter axis ramps at half the configured rate.
        assert_eq!(ctl.registry.get(a).unwrap().moving_acceleration, 200_000);
        assert_eq!(ctl.registry.get(b).unwrap().moving_acceleration, 100_000);
    }

    #[test]
    fn test_zero_acceleration_turns_move_into_coast() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.set_acceleration(b, 0).unwrap();
        ctl.move_to_positions(&[a, b], &[4000, 2000], false).unwrap();

        // No ramp slices at all: one coasting burst per axis.
        assert_eq!(ctl.backend().burst_count(), 2);
        assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 4000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 2000);
    }

    #[test]
    fn test_sequential_mode_reaches_same_targets() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.move_to_positions(&[a, b], &[4000, 2000], true).unwrap();

        assert_eq!(ctl.position(a).unwrap(), 4000);
        assert_eq!(ctl.position(b).unwrap(), 2000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 4000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 2000);
    }

    #[test]
    fn test_tiny_share_axis_coasts_its_whole_distance() {
        let (mut ctl, a, b) = two_axis_rig();
        // Axis b's share per slice is 2000/400 = 5, at or below the
        // dispatch threshold, so every acceleration slice credits
        // 2 * 5 steps to its coast instead of bursting.
        ctl.move_to_positions(&[a, b], &[40_000, 2000], false).unwrap();

        assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 2000 + 5 * 2 * 200);
        assert_eq!(ctl.position(b).unwrap(), 2000);
    }

    #[test]
    fn test_opposite_directions() {
        let (mut ctl, a, b) = two_axis_rig();
        ctl.set_position(a, 1000).unwrap();
        ctl.move_to_positions(&[a, b], &[0, 1000], false).unwrap();

        assert_eq!(ctl.position(a).unwrap(), 0);
        assert_eq!(ctl.position(b).unwrap(), 1000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 1000);
        assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 1000);
    }
}
