//! Interpreted control engine.
//!
//! Linearization, P/I/D blocks and the control law evaluated in wide `i64`
//! arithmetic. Results match the fixed-point native library for every input
//! inside the validated configuration domain.

pub mod blocks;
pub mod law;
pub mod linearize;
