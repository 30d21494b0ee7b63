//! Prelude module for common re-exports.
//!
//! ```rust
//! use car_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control::config::{
    ActuationConfig, BridgeConfig, ControlConfig, CycleConfig, LawConfig, LinearizationConfig,
    SteeringConfig, VerifierConfig,
};

// ─── Control State ──────────────────────────────────────────────────
pub use crate::control::state::{
    Commands, Distances, DriveMode, Feedback, LawOutput, SensorChannel, SensorFrame,
    SharedControlState, TickInput,
};

// ─── Native ABI ─────────────────────────────────────────────────────
pub use crate::control::native::NativeParams;
pub use crate::manifest::{MANIFEST_VERSION, ManifestSymbols, NativeSymbols};
