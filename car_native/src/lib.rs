//! CrazyCar native control law.
//!
//! Fixed-point implementation of the control law, exported through the C
//! ABI as the symbol set listed in [`car_common::manifest`]. The library keeps
//! one process-wide [`NativeState`](law::NativeState) behind a
//! `parking_lot::Mutex`; every export locks it for the duration of the call.
//!
//! The controller bridge loads the `cdylib` build with `libloading`. Tests
//! link the `rlib` build and obtain the same entry points through
//! [`symbol_table`].
//!
//! Panics never cross the ABI boundary: [`car_configure`] and
//! [`car_control_step`] catch them and report [`status::PANICKED`].

pub mod fixed;
pub mod law;

use std::panic::{AssertUnwindSafe, catch_unwind};

use car_common::control::native::NativeParams;
use car_common::control::state::SensorChannel;
use car_common::manifest::{MANIFEST_VERSION, NativeSymbols, status};
use parking_lot::Mutex;

use crate::fixed::FixedParams;
use crate::law::NativeState;

static STATE: Mutex<NativeState> = parking_lot::const_mutex(NativeState::POWER_ON);

// ─── Manifest / Configuration ───────────────────────────────────────

/// Manifest version this library implements.
#[unsafe(no_mangle)]
pub extern "C" fn car_manifest_version() -> u32 {
    MANIFEST_VERSION
}

/// Install a parameter block and clear all tick memory.
///
/// Returns [`status::OK`], [`status::NULL_POINTER`], [`status::BAD_PARAMS`]
/// or [`status::PANICKED`]. A rejected block leaves the previous
/// parameters in place.
///
/// # Safety
///
/// `params` must be null or point to a valid, aligned [`NativeParams`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn car_configure(params: *const NativeParams) -> i32 {
    // SAFETY: the caller guarantees `params` is null or valid.
    let Some(params) = (unsafe { params.as_ref() }) else {
        return status::NULL_POINTER;
    };
    let params = *params;
    catch_unwind(AssertUnwindSafe(|| match FixedParams::from_native(&params) {
        Ok(fixed) => {
            STATE.lock().configure(fixed);
            status::OK
        }
        Err(code) => code,
    }))
    .unwrap_or(status::PANICKED)
}

// ─── Feedback ───────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn car_set_power_feedback(power: i8) {
    STATE.lock().set_power_feedback(power);
}

#[unsafe(no_mangle)]
pub extern "C" fn car_get_power_feedback() -> i8 {
    STATE.lock().power_feedback()
}

#[unsafe(no_mangle)]
pub extern "C" fn car_set_steer_feedback(angle: i8) {
    STATE.lock().set_steer_feedback(angle);
}

#[unsafe(no_mangle)]
pub extern "C" fn car_get_steer_feedback() -> i8 {
    STATE.lock().steer_feedback()
}

// ─── Sensor Ingestion ───────────────────────────────────────────────

/// Linearize a front sample with the straight-ahead angle factor.
#[unsafe(no_mangle)]
pub extern "C" fn car_ingest_front(raw: u16) {
    STATE.lock().ingest(SensorChannel::Front, raw, 0);
}

#[unsafe(no_mangle)]
pub extern "C" fn car_ingest_left(raw: u16, angle_factor: u8) {
    STATE.lock().ingest(SensorChannel::Left, raw, angle_factor);
}

#[unsafe(no_mangle)]
pub extern "C" fn car_ingest_right(raw: u16, angle_factor: u8) {
    STATE.lock().ingest(SensorChannel::Right, raw, angle_factor);
}

// ─── Control Step / Readback ────────────────────────────────────────

/// Evaluate one tick. Returns [`status::OK`] or [`status::PANICKED`].
#[unsafe(no_mangle)]
pub extern "C" fn car_control_step() -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        STATE.lock().step();
        status::OK
    }))
    .unwrap_or(status::PANICKED)
}

#[unsafe(no_mangle)]
pub extern "C" fn car_power_command() -> i32 {
    STATE.lock().power_command() as i32
}

#[unsafe(no_mangle)]
pub extern "C" fn car_steer_command() -> i32 {
    STATE.lock().steer_command() as i32
}

#[unsafe(no_mangle)]
pub extern "C" fn car_distance_front() -> u16 {
    STATE.lock().distances().front
}

#[unsafe(no_mangle)]
pub extern "C" fn car_distance_left() -> u16 {
    STATE.lock().distances().left
}

#[unsafe(no_mangle)]
pub extern "C" fn car_distance_right() -> u16 {
    STATE.lock().distances().right
}

#[unsafe(no_mangle)]
pub extern "C" fn car_drive_mode() -> u8 {
    STATE.lock().mode() as u8
}

/// Entry points of this library as statically linked function pointers.
pub fn symbol_table() -> NativeSymbols {
    NativeSymbols {
        manifest_version: car_manifest_version,
        configure: car_configure,
        set_power_feedback: car_set_power_feedback,
        get_power_feedback: car_get_power_feedback,
        set_steer_feedback: car_set_steer_feedback,
        get_steer_feedback: car_get_steer_feedback,
        ingest_front: car_ingest_front,
        ingest_left: car_ingest_left,
        ingest_right: car_ingest_right,
        control_step: car_control_step,
        power_command: car_power_command,
        steer_command: car_steer_command,
        distance_front: car_distance_front,
        distance_left: car_distance_left,
        distance_right: car_distance_right,
        drive_mode: car_drive_mode,
    }
}
