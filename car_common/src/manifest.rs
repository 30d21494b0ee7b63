//! Symbol manifest of the native control law.
//!
//! The controller bridge drives a native library exclusively through the
//! entry points listed here. A library is usable only if every entry
//! resolves and `car_manifest_version` reports [`MANIFEST_VERSION`].
//! Adding a capability means adding a flag, a name and a function pointer
//! type below and bumping the version.
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | feedback set/get, distance ingestion, control step, command getters |
//! | 2 | `car_manifest_version`, `car_configure`, distance and mode readback |

use bitflags::bitflags;

use crate::control::native::NativeParams;

/// Current manifest version.
pub const MANIFEST_VERSION: u32 = 2;

bitflags! {
    /// One bit per required native entry point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ManifestSymbols: u16 {
        const MANIFEST_VERSION    = 1 << 0;
        const CONFIGURE           = 1 << 1;
        const SET_POWER_FEEDBACK  = 1 << 2;
        const GET_POWER_FEEDBACK  = 1 << 3;
        const SET_STEER_FEEDBACK  = 1 << 4;
        const GET_STEER_FEEDBACK  = 1 << 5;
        const INGEST_FRONT        = 1 << 6;
        const INGEST_LEFT         = 1 << 7;
        const INGEST_RIGHT        = 1 << 8;
        const CONTROL_STEP        = 1 << 9;
        const POWER_COMMAND       = 1 << 10;
        const STEER_COMMAND       = 1 << 11;
        const DISTANCE_FRONT      = 1 << 12;
        const DISTANCE_LEFT       = 1 << 13;
        const DISTANCE_RIGHT      = 1 << 14;
        const DRIVE_MODE          = 1 << 15;
    }
}

/// Exported name of every manifest entry.
pub const SYMBOL_NAMES: [(ManifestSymbols, &str); 16] = [
    (ManifestSymbols::MANIFEST_VERSION, "car_manifest_version"),
    (ManifestSymbols::CONFIGURE, "car_configure"),
    (ManifestSymbols::SET_POWER_FEEDBACK, "car_set_power_feedback"),
    (ManifestSymbols::GET_POWER_FEEDBACK, "car_get_power_feedback"),
    (ManifestSymbols::SET_STEER_FEEDBACK, "car_set_steer_feedback"),
    (ManifestSymbols::GET_STEER_FEEDBACK, "car_get_steer_feedback"),
    (ManifestSymbols::INGEST_FRONT, "car_ingest_front"),
    (ManifestSymbols::INGEST_LEFT, "car_ingest_left"),
    (ManifestSymbols::INGEST_RIGHT, "car_ingest_right"),
    (ManifestSymbols::CONTROL_STEP, "car_control_step"),
    (ManifestSymbols::POWER_COMMAND, "car_power_command"),
    (ManifestSymbols::STEER_COMMAND, "car_steer_command"),
    (ManifestSymbols::DISTANCE_FRONT, "car_distance_front"),
    (ManifestSymbols::DISTANCE_LEFT, "car_distance_left"),
    (ManifestSymbols::DISTANCE_RIGHT, "car_distance_right"),
    (ManifestSymbols::DRIVE_MODE, "car_drive_mode"),
];

impl ManifestSymbols {
    /// Exported names of the set flags, in manifest order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        SYMBOL_NAMES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }

    /// Flag of an exported symbol name. `from_name` matches flag
    /// identifiers instead.
    pub fn from_symbol(name: &str) -> Option<Self> {
        SYMBOL_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(flag, _)| *flag)
    }
}

/// Status codes returned by `car_configure` and `car_control_step`.
pub mod status {
    /// Call succeeded.
    pub const OK: i32 = 0;
    /// Null parameter pointer.
    pub const NULL_POINTER: i32 = 1;
    /// Parameter block rejected (wrong version or out-of-range value).
    pub const BAD_PARAMS: i32 = 2;
    /// A panic was caught at the ABI boundary.
    pub const PANICKED: i32 = 3;
}

// ─── Entry Point Signatures ─────────────────────────────────────────

pub type ManifestVersionFn = unsafe extern "C" fn() -> u32;
pub type ConfigureFn = unsafe extern "C" fn(*const NativeParams) -> i32;
pub type SetFeedbackFn = unsafe extern "C" fn(i8);
pub type GetFeedbackFn = unsafe extern "C" fn() -> i8;
pub type IngestFrontFn = unsafe extern "C" fn(u16);
pub type IngestSideFn = unsafe extern "C" fn(u16, u8);
pub type ControlStepFn = unsafe extern "C" fn() -> i32;
pub type CommandFn = unsafe extern "C" fn() -> i32;
pub type DistanceFn = unsafe extern "C" fn() -> u16;
pub type DriveModeFn = unsafe extern "C" fn() -> u8;

/// Resolved entry points of one native control law.
#[derive(Debug, Clone, Copy)]
pub struct NativeSymbols {
    pub manifest_version: ManifestVersionFn,
    pub configure: ConfigureFn,
    pub set_power_feedback: SetFeedbackFn,
    pub get_power_feedback: GetFeedbackFn,
    pub set_steer_feedback: SetFeedbackFn,
    pub get_steer_feedback: GetFeedbackFn,
    pub ingest_front: IngestFrontFn,
    pub ingest_left: IngestSideFn,
    pub ingest_right: IngestSideFn,
    pub control_step: ControlStepFn,
    pub power_command: CommandFn,
    pub steer_command: CommandFn,
    pub distance_front: DistanceFn,
    pub distance_left: DistanceFn,
    pub distance_right: DistanceFn,
    pub drive_mode: DriveModeFn,
}
