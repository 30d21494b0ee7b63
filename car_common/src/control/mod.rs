//! Control core shared types.
//!
//! Contains the TOML configuration surface, the shared control state the
//! bridge owns, and the `#[repr(C)]` parameter block handed to the native
//! control law.

pub mod config;
pub mod native;
pub mod state;
