//! Runtime fallback from a misbehaving native library.

use std::sync::atomic::{AtomicU32, Ordering};

use car_common::control::config::ControlConfig;
use car_common::control::state::{DriveMode, SensorFrame};
use car_common::manifest::status;
use car_control_unit::actuation::{Actuator, SimActuator};
use car_control_unit::bridge::lifecycle::Lifecycle;
use car_control_unit::bridge::{BridgeStats, ControllerBridge};
use car_control_unit::variant::VariantKind;
use car_control_unit::verify::VerificationResult;

use super::{linked_loader, native_lock};

fn verified() -> VerificationResult {
    VerificationResult {
        ok: true,
        missing: Default::default(),
        failure: None,
        artifact: "linked".into(),
    }
}

static FLAKY_CALLS: AtomicU32 = AtomicU32::new(0);

// Healthy for two ticks, then reports a caught panic.
unsafe extern "C" fn flaky_step() -> i32 {
    if FLAKY_CALLS.fetch_add(1, Ordering::SeqCst) >= 2 {
        status::PANICKED
    } else {
        car_native::car_control_step()
    }
}

unsafe extern "C" fn runaway_power() -> i32 {
    500
}

unsafe extern "C" fn bogus_mode() -> u8 {
    9
}

#[test]
fn failing_step_recomputes_tick_on_interpreted() {
    let _guard = native_lock();
    FLAKY_CALLS.store(0, Ordering::SeqCst);
    let mut symbols = car_native::symbol_table();
    symbols.control_step = flaky_step;

    let config = ControlConfig::default();
    let mut bridge =
        ControllerBridge::start_with(&config, Some(&verified()), linked_loader(symbols)).unwrap();
    let mut actuator = SimActuator::default();

    let mut reports = Vec::new();
    for _ in 0..5 {
        bridge.ingest(SensorFrame::default(), actuator.feedback());
        reports.push(bridge.step(&mut actuator).unwrap());
    }

    let variants: Vec<_> = reports.iter().map(|r| r.variant).collect();
    assert_eq!(
        variants,
        vec![
            VariantKind::Native,
            VariantKind::Native,
            VariantKind::Interpreted,
            VariantKind::Interpreted,
            VariantKind::Interpreted,
        ]
    );
    assert!(reports[2].fallback);
    assert!(!reports[3].fallback);
    // every tick still produced exactly one applied command pair
    assert_eq!(bridge.state().tick, 5);
    assert_eq!(reports[2].mode, DriveMode::FarTracking);
    assert_eq!(actuator.last_commands(), Some(reports[4].commands));

    assert_eq!(bridge.lifecycle(), Lifecycle::VerifiedFailed);
    assert_eq!(FLAKY_CALLS.load(Ordering::SeqCst), 3, "native retried after failure");
    assert_eq!(
        bridge.stats(),
        BridgeStats {
            native_ticks: 2,
            interpreted_ticks: 3,
            fallbacks: 1,
        }
    );
}

#[test]
fn reverify_brings_native_back() {
    let _guard = native_lock();
    FLAKY_CALLS.store(0, Ordering::SeqCst);
    let mut symbols = car_native::symbol_table();
    symbols.control_step = flaky_step;

    let config = ControlConfig::default();
    let mut bridge =
        ControllerBridge::start_with(&config, Some(&verified()), linked_loader(symbols)).unwrap();
    let mut actuator = SimActuator::default();
    for _ in 0..3 {
        bridge.step(&mut actuator).unwrap();
    }
    assert_eq!(bridge.selected(), VariantKind::Interpreted);

    FLAKY_CALLS.store(0, Ordering::SeqCst);
    assert_eq!(bridge.reverify(&verified()), Lifecycle::VerifiedOk);
    assert_eq!(bridge.step(&mut actuator).unwrap().variant, VariantKind::Native);
}

#[test]
fn out_of_range_command_is_a_failure() {
    let _guard = native_lock();
    let mut symbols = car_native::symbol_table();
    symbols.power_command = runaway_power;

    let config = ControlConfig::default();
    let mut bridge =
        ControllerBridge::start_with(&config, Some(&verified()), linked_loader(symbols)).unwrap();
    let mut actuator = SimActuator::default();
    let report = bridge.step(&mut actuator).unwrap();

    assert!(report.fallback);
    assert_eq!(report.variant, VariantKind::Interpreted);
    assert_eq!(report.commands.power, 29);
    assert_eq!(actuator.last_commands(), Some(report.commands));
}

#[test]
fn unknown_drive_mode_is_a_failure() {
    let _guard = native_lock();
    let mut symbols = car_native::symbol_table();
    symbols.drive_mode = bogus_mode;

    let config = ControlConfig::default();
    let mut bridge =
        ControllerBridge::start_with(&config, Some(&verified()), linked_loader(symbols)).unwrap();
    let report = bridge.step(&mut SimActuator::default()).unwrap();
    assert!(report.fallback);
    assert_eq!(bridge.lifecycle(), Lifecycle::VerifiedFailed);
}

#[test]
fn failed_verification_never_calls_native() {
    let _guard = native_lock();
    FLAKY_CALLS.store(0, Ordering::SeqCst);
    let mut symbols = car_native::symbol_table();
    symbols.control_step = flaky_step;

    let result = VerificationResult {
        ok: false,
        missing: ["car_control_step"].into_iter().collect(),
        failure: Some(car_control_unit::verify::VerifyFailure::MissingSymbols),
        artifact: "linked".into(),
    };
    let config = ControlConfig::default();
    let mut bridge =
        ControllerBridge::start_with(&config, Some(&result), linked_loader(symbols)).unwrap();
    bridge.step(&mut SimActuator::default()).unwrap();
    assert_eq!(FLAKY_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(bridge.stats().interpreted_ticks, 1);
}
