//! CrazyCar Common Library
//!
//! Shared constants, configuration and ABI definitions for the CrazyCar
//! control core. Both control-law variants (the compiled `car_native`
//! library and the interpreted reference in `car_control_unit`) depend on
//! this crate, so the numeric contract between them lives here exactly once.
//!
//! # Module Structure
//!
//! - [`consts`] - Calibration defaults and fixed-point width limits
//! - [`config`] - Configuration loading trait and shared config types
//! - [`control`] - Control configuration, shared state and native parameters
//! - [`manifest`] - Symbol manifest the bridge requires from a native library
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use car_common::prelude::*;
//!
//! let config = ControlConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod manifest;
pub mod prelude;
