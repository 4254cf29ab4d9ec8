//! Integration tests for the stepstream library.
//!
//! These tests drive the full stack over the simulation backend: TOML
//! configuration to axis claiming, single-axis trapezoidal moves and
//! synchronized multi-axis moves, asserting on the exact burst traffic
//! that reaches the hardware boundary.

use embedded_hal_mock::eh1::delay::NoopDelay;
use proptest::prelude::*;

use stepstream::hal::sim::SimBackend;
use stepstream::{
    parse_config, BurstChannel, CompletionAction, ControlWord, DeviceId, Error, MotionController,
    WiringProgram,
};

const TWO_AXIS_CONFIG: &str = r#"
[axes.pan]
name = "Pan Axis"
dir_pin = 21
step_pin = 20
min_speed_sps = 10000
max_speed_sps = 60000
acceleration_sps2 = 200000

[axes.tilt]
name = "Tilt Axis"
base_pin = 2
wiring = "four_wire"
min_speed_sps = 5000
max_speed_sps = 20000
acceleration_sps2 = 100000
enabled = false
"#;

fn controller() -> MotionController<SimBackend, NoopDelay> {
    MotionController::new(SimBackend::new(), NoopDelay)
}

// =============================================================================
// Configuration to claimed axis
// =============================================================================

#[test]
fn claim_axes_from_toml_config() {
    let config = parse_config(TWO_AXIS_CONFIG).expect("config should parse");
    let mut ctl = controller();

    let pan = ctl.claim_axis_from_config(&config, "pan").expect("pan claims");
    let tilt = ctl.claim_axis_from_config(&config, "tilt").expect("tilt claims");
    assert_eq!(ctl.device_count(), 2);

    // Pan: dir 21 > step 20 selects the plain two-wire program at 20.
    assert_eq!(ctl.backend().programs[0].program, WiringProgram::TwoWire);
    assert_eq!(ctl.backend().programs[0].base_pin, 20);
    // Tilt: explicit wiring.
    assert_eq!(ctl.backend().programs[1].program, WiringProgram::FourWire);
    assert_eq!(ctl.backend().programs[1].base_pin, 2);

    assert!(ctl.enabled(pan).unwrap());
    assert!(!ctl.enabled(tilt).unwrap());
    assert_eq!(ctl.acceleration(tilt).unwrap(), 100_000);
}

#[test]
fn unknown_axis_name_is_a_config_error() {
    let config = parse_config(TWO_AXIS_CONFIG).expect("config should parse");
    let mut ctl = controller();
    assert!(matches!(
        ctl.claim_axis_from_config(&config, "zoom"),
        Err(Error::Config(_))
    ));
    assert_eq!(ctl.device_count(), 0);
}

// =============================================================================
// Resource exhaustion
// =============================================================================

#[test]
fn claiming_stops_at_the_pulse_channel_pool() {
    let mut ctl = controller();
    // Two banks of four channels each.
    for _ in 0..8 {
        ctl.claim_axis(0, WiringProgram::TwoWire).expect("pool not yet empty");
    }
    assert_eq!(
        ctl.claim_axis(0, WiringProgram::TwoWire),
        Err(Error::ResourceExhausted)
    );
    assert_eq!(ctl.device_count(), 8);
}

// =============================================================================
// End-to-end trapezoidal move
// =============================================================================

#[test]
fn trapezoidal_move_ramps_up_and_back_down() {
    let config = parse_config(TWO_AXIS_CONFIG).expect("config should parse");
    let mut ctl = controller();
    let pan = ctl.claim_axis_from_config(&config, "pan").expect("pan claims");

    ctl.move_to_position(pan, 2000).expect("move should run");
    assert_eq!(ctl.position(pan).unwrap(), 2000);
    assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 2000);
    assert!(!ctl.is_running(pan).unwrap());

    let delays: Vec<u32> = ctl
        .backend()
        .bursts_on(BurstChannel(0))
        .map(|b| ControlWord::from_raw(b.command).delay())
        .collect();

    // 20 slices: 10 accelerating, 10 decelerating. The up-ramp shortens
    // delays monotonically; the move ends back at the starting delay.
    assert_eq!(delays.len(), 20);
    for pair in delays[..10].windows(2) {
        assert!(pair[1] <= pair[0]);
    }
    assert_eq!(ctl.delay(pan).unwrap(), delays[0]);
}

// =============================================================================
// Synchronized multi-axis move
// =============================================================================

#[test]
fn multi_axis_move_is_proportional() {
    let mut ctl = controller();
    let a = ctl.claim_axis_with_pins(21, 20).expect("axis a claims");
    let b = ctl.claim_axis_with_pins(18, 19).expect("axis b claims");
    for id in [a, b] {
        ctl.set_enabled(id, true).unwrap();
        ctl.set_min_speed(id, 10_000).unwrap();
        ctl.set_max_speed(id, 60_000).unwrap();
        ctl.set_acceleration(id, 200_000).unwrap();
    }

    ctl.move_to_positions(&[a, b], &[4000, 2000], false)
        .expect("synchronized move should run");

    assert_eq!(ctl.position(a).unwrap(), 4000);
    assert_eq!(ctl.position(b).unwrap(), 2000);
    assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 4000);
    assert_eq!(ctl.backend().steps_on(BurstChannel(1)), 2000);

    // The shorter axis takes half the steps per slice over the same
    // number of slices, so both finish together.
    let a_first = ctl.backend().bursts_on(BurstChannel(0)).next().unwrap().steps;
    let b_first = ctl.backend().bursts_on(BurstChannel(1)).next().unwrap().steps;
    assert_eq!(a_first, 2 * b_first);
    assert_eq!(
        ctl.backend().bursts_on(BurstChannel(0)).count(),
        ctl.backend().bursts_on(BurstChannel(1)).count()
    );
}

// =============================================================================
// Completion dispatch
// =============================================================================

#[test]
fn user_callback_chains_bursts() {
    static BURSTS_LEFT: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(4);

    fn chain(ctl: &mut MotionController<SimBackend, NoopDelay>, id: DeviceId) {
        use std::sync::atomic::Ordering;
        if BURSTS_LEFT.fetch_sub(1, Ordering::Relaxed) > 1 {
            ctl.move_async(id, 50, CompletionAction::User(chain)).unwrap();
        }
    }

    let mut ctl = controller();
    let id = ctl.claim_axis(0, WiringProgram::TwoWire).expect("axis claims");
    ctl.set_min_speed(id, 10_000).unwrap();
    ctl.set_enabled(id, true).unwrap();

    ctl.move_async(id, 50, CompletionAction::User(chain)).expect("first burst");
    ctl.wait_idle(id);

    assert_eq!(ctl.backend().burst_count(), 4);
    assert_eq!(ctl.backend().steps_on(BurstChannel(0)), 200);
}

// =============================================================================
// Control-word and conversion properties
// =============================================================================

proptest! {
    #[test]
    fn control_word_round_trips(
        delay in 0u32..=stepstream::command::DELAY_MAX,
        direction: bool,
        enabled: bool,
    ) {
        let word = ControlWord::encode(delay, direction, enabled);
        prop_assert_eq!(word.delay(), delay);
        prop_assert_eq!(word.direction(), direction);
        prop_assert_eq!(word.enabled(), enabled);
    }

    #[test]
    fn speed_to_delay_never_exceeds_field(rate in 0u32..=1_000_000) {
        prop_assert!(stepstream::timing::speed_to_delay(rate) <= stepstream::command::DELAY_MAX);
    }

    #[test]
    fn faster_speeds_never_lengthen_delay(a in 1u32..=200_000, b in 1u32..=200_000) {
        let (slow, fast) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            stepstream::timing::speed_to_delay(fast) <= stepstream::timing::speed_to_delay(slow)
        );
    }
}
