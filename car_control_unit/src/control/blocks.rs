//! Proportional, integral and derivative blocks.
//!
//! Percent-scaled gains, truncating division. Errors are saturated to
//! `±ERROR_LIMIT` before they enter a block; validated gains keep every
//! output inside `i16` even though the arithmetic here is `i64`.
//!
//! Zero Ki disables integral output; zero Kd disables derivative output.

use car_common::consts::{DERIVATIVE_DIVISOR, ERROR_LIMIT, PERCENT_SCALE};
use car_common::control::config::SteeringConfig;

/// Clamp a difference into the error domain.
#[inline]
pub fn saturate(value: i64) -> i64 {
    value.clamp(-(ERROR_LIMIT as i64), ERROR_LIMIT as i64)
}

/// `error * gain / 100`.
#[inline]
pub fn proportional(error: i64, gain: i64) -> i64 {
    error * gain / PERCENT_SCALE as i64
}

/// Accumulate into `acc` clamped to `±limit`, then scale by `gain`.
#[inline]
pub fn integral(acc: &mut i64, error: i64, gain: i64, limit: i64) -> i64 {
    *acc = (error + *acc).clamp(-limit, limit);
    *acc * gain / PERCENT_SCALE as i64
}

/// `((error - prev) / 2) * gain / 100`.
#[inline]
pub fn derivative(prev: i64, error: i64, gain: i64) -> i64 {
    let rate = (error - prev) / DERIVATIVE_DIVISOR as i64;
    rate * gain / PERCENT_SCALE as i64
}

/// Memory of a PID block between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidState {
    /// Integral accumulator.
    integral: i64,
    /// Previous error (for derivative).
    prev_error: i64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> i64 {
        self.integral
    }
}

/// PID gains and accumulator bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidGains {
    pub kp: i64,
    pub ki: i64,
    pub kd: i64,
    pub integral_limit: i64,
}

impl From<&SteeringConfig> for PidGains {
    fn from(config: &SteeringConfig) -> Self {
        Self {
            kp: config.kp as i64,
            ki: config.ki as i64,
            kd: config.kd as i64,
            integral_limit: config.integral_limit as i64,
        }
    }
}

/// One PID evaluation (unsaturated sum of the three blocks).
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: i64) -> i64 {
    let p_term = proportional(error, gains.kp);
    let i_term = integral(&mut state.integral, error, gains.ki, gains.integral_limit);
    let d_term = derivative(state.prev_error, error, gains.kd);
    state.prev_error = error;
    p_term + i_term + d_term
}

// ─── Tests ──────────────────────────────────────────────────────────
