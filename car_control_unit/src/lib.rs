//! # CrazyCar Control Unit Library
//!
//! Single-threaded control core of one CrazyCar. Every tick a sensor frame
//! is linearized, the control law turns distances and actuator feedback into
//! propulsion and steering commands, and the controller bridge applies them
//! to the actuator exactly once.
//!
//! ## Variants
//!
//! The control law exists twice:
//!
//! 1. **Native**: the fixed-point `car_native` library, loaded at runtime
//!    and trusted only after [`verify::BuildVerifier`] has confirmed its
//!    symbol manifest.
//! 2. **Interpreted**: [`control::law::InterpretedLaw`], a wide-integer
//!    reference evaluated in-process.
//!
//! [`bridge::ControllerBridge`] selects between them per tick from the
//! verification lifecycle and falls back to the interpreted law on the same
//! tick when the native call fails.

pub mod actuation;
pub mod bridge;
pub mod config;
pub mod control;
pub mod cycle;
pub mod native;
pub mod sensor;
pub mod variant;
pub mod verify;
