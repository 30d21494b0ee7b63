//! Fixed-width arithmetic of the native control law.
//!
//! Errors and block outputs are `i16`, products `i32`, distances `u16`,
//! linearization `u32`. [`FixedParams::from_native`] refuses any parameter
//! block that could push a product or an output outside these widths.
//! Division truncates toward zero everywhere.

use car_common::consts::{
    ADC_RANGE_MAX, DERIVATIVE_DIVISOR, ERROR_LIMIT, GAIN_LIMIT, PERCENT_SCALE, POWER_LIMIT,
    STEER_LIMIT_MAX,
};
use car_common::control::native::NativeParams;
use car_common::manifest::{MANIFEST_VERSION, status};

// ─── Parameters ─────────────────────────────────────────────────────

/// Parameter block narrowed to the widths the law computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedParams {
    pub adc_min: u16,
    pub adc_max: u16,
    pub linear_a: u32,
    pub linear_b: u32,
    pub cos_straight: u8,

    pub near_threshold_cm: u16,
    pub reverse_threshold_cm: u16,
    pub far_threshold_cm: u16,
    pub setpoint_cm: u16,
    pub power_gain: i16,
    pub power_min: i16,
    pub power_max: i16,
    pub kick_power: i16,
    pub reverse_power: i16,
    pub avoid_steer: i16,

    pub steer_kp: i16,
    pub steer_ki: i16,
    pub steer_kd: i16,
    pub steer_integral_limit: i16,
    pub steer_limit: i16,
    pub steer_window_cm: u16,
}

impl FixedParams {
    /// Power-on parameters.
    pub const POWER_ON: Self = match Self::from_native(&NativeParams::DEFAULT) {
        Ok(params) => params,
        Err(_) => panic!("default native parameters out of range"),
    };

    /// Narrow and range-check a parameter block.
    ///
    /// Returns `status::BAD_PARAMS` for a foreign manifest version or any
    /// value outside the fixed-point contract.
    pub const fn from_native(p: &NativeParams) -> Result<Self, i32> {
        if p.manifest_version != MANIFEST_VERSION {
            return Err(status::BAD_PARAMS);
        }
        if p.adc_min > p.adc_max || p.adc_max > ADC_RANGE_MAX as u32 {
            return Err(status::BAD_PARAMS);
        }
        if p.linear_a == 0 || p.cos_straight == 0 || p.cos_straight > u8::MAX as u32 {
            return Err(status::BAD_PARAMS);
        }
        let denominator = match p.adc_max.checked_add(p.linear_b) {
            Some(_) => p.adc_min + p.linear_b,
            None => return Err(status::BAD_PARAMS),
        };
        if denominator == 0 || (p.linear_a / denominator) as u64 * 100 > u16::MAX as u64 {
            return Err(status::BAD_PARAMS);
        }

        let distance_max = u16::MAX as u32;
        if p.near_threshold_cm > distance_max
            || p.reverse_threshold_cm > distance_max
            || p.far_threshold_cm > distance_max
            || p.setpoint_cm > distance_max
            || p.steer_window_cm > distance_max
        {
            return Err(status::BAD_PARAMS);
        }

        let gain = GAIN_LIMIT as i32;
        if !within(p.power_gain, gain)
            || !within(p.steer_kp, gain)
            || !within(p.steer_ki, gain)
            || !within(p.steer_kd, gain)
        {
            return Err(status::BAD_PARAMS);
        }
        let power = POWER_LIMIT as i32;
        if !within(p.power_min, power)
            || !within(p.power_max, power)
            || !within(p.kick_power, power)
            || !within(p.reverse_power, power)
            || p.power_min > p.power_max
        {
            return Err(status::BAD_PARAMS);
        }
        let steer = STEER_LIMIT_MAX as i32;
        if p.avoid_steer < 0
            || p.avoid_steer > steer
            || p.steer_limit < 0
            || p.steer_limit > steer
            || p.steer_integral_limit < 0
            || p.steer_integral_limit > ERROR_LIMIT as i32
        {
            return Err(status::BAD_PARAMS);
        }

        Ok(Self {
            adc_min: p.adc_min as u16,
            adc_max: p.adc_max as u16,
            linear_a: p.linear_a,
            linear_b: p.linear_b,
            cos_straight: p.cos_straight as u8,
            near_threshold_cm: p.near_threshold_cm as u16,
            reverse_threshold_cm: p.reverse_threshold_cm as u16,
            far_threshold_cm: p.far_threshold_cm as u16,
            setpoint_cm: p.setpoint_cm as u16,
            power_gain: p.power_gain as i16,
            power_min: p.power_min as i16,
            power_max: p.power_max as i16,
            kick_power: p.kick_power as i16,
            reverse_power: p.reverse_power as i16,
            avoid_steer: p.avoid_steer as i16,
            steer_kp: p.steer_kp as i16,
            steer_ki: p.steer_ki as i16,
            steer_kd: p.steer_kd as i16,
            steer_integral_limit: p.steer_integral_limit as i16,
            steer_limit: p.steer_limit as i16,
            steer_window_cm: p.steer_window_cm as u16,
        })
    }
}

const fn within(value: i32, limit: i32) -> bool {
    value >= -limit && value <= limit
}

// ─── Linearization ──────────────────────────────────────────────────

/// Raw ADC sample → distance [cm].
///
/// An angle factor of 0 is treated as 1.
#[inline]
pub fn linearize(raw: u16, angle_factor: u8, params: &FixedParams) -> u16 {
    let raw = raw.max(params.adc_min).min(params.adc_max) as u32;
    let angle = angle_factor.max(1) as u32;
    let cm = (params.linear_a / (raw + params.linear_b)) * PERCENT_SCALE as u32 / angle;
    cm.min(u16::MAX as u32) as u16
}

// ─── Control Blocks ─────────────────────────────────────────────────

/// Clamp a wide difference into the `i16` error domain.
#[inline]
pub fn saturate(value: i32) -> i16 {
    value.clamp(-(ERROR_LIMIT as i32), ERROR_LIMIT as i32) as i16
}

/// `error * gain / 100`.
#[inline]
pub fn proportional(error: i16, gain: i16) -> i16 {
    (error as i32 * gain as i32 / PERCENT_SCALE) as i16
}

/// Accumulate `error` into `acc` (clamped to `±limit`) and scale by `gain`.
#[inline]
pub fn integral(acc: &mut i16, error: i16, gain: i16, limit: i16) -> i16 {
    let limit = limit as i32;
    *acc = (error as i32 + *acc as i32).clamp(-limit, limit) as i16;
    (*acc as i32 * gain as i32 / PERCENT_SCALE) as i16
}

/// `((error - prev) / 2) * gain / 100`.
#[inline]
pub fn derivative(prev: i16, error: i16, gain: i16) -> i16 {
    let rate = (error as i32 - prev as i32) / DERIVATIVE_DIVISOR;
    (rate * gain as i32 / PERCENT_SCALE) as i16
}
