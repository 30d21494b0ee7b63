//! Control-law variant abstraction.
//!
//! The bridge evaluates exactly one [`ControlLaw`] per tick. Both the
//! native library and the interpreted reference implement it, so selection
//! and fallback never depend on which variant is behind the trait object.

use car_common::consts::{POWER_LIMIT, STEER_LIMIT_MAX};
use car_common::control::state::{Commands, LawOutput, TickInput};
use thiserror::Error;

/// Which implementation produced a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Native,
    Interpreted,
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Interpreted => f.write_str("interpreted"),
        }
    }
}

/// Failure of one control-law invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LawError {
    /// Native call returned a non-zero status.
    #[error("native call returned status {0}")]
    Status(i32),

    /// A panic was caught at the ABI boundary.
    #[error("native call panicked")]
    Panicked,

    /// Produced commands outside the actuator range.
    #[error("commands out of range: power={power}, steer={steer}")]
    OutOfRange { power: i32, steer: i32 },

    /// Reported drive mode unknown to this build.
    #[error("unknown drive mode {0}")]
    UnknownMode(u8),
}

/// One implementation of the control law.
pub trait ControlLaw {
    /// Variant identity.
    fn kind(&self) -> VariantKind;

    /// Evaluate one tick.
    fn step(&mut self, input: &TickInput) -> Result<LawOutput, LawError>;

    /// Forget integrator and derivative memory.
    fn reset(&mut self);
}

/// Reject commands no actuator accepts.
pub fn check_command_range(commands: &Commands) -> Result<(), LawError> {
    if commands.power.unsigned_abs() > POWER_LIMIT as u32
        || commands.steer.unsigned_abs() > STEER_LIMIT_MAX as u32
    {
        return Err(LawError::OutOfRange {
            power: commands.power,
            steer: commands.steer,
        });
    }
    Ok(())
}
