//! Parameter block passed across the native ABI.
//!
//! The native library cannot read TOML, so the bridge flattens a validated
//! [`ControlConfig`] into this `#[repr(C)]` block and hands it over through
//! `car_configure`. Every field is a 32-bit integer so the layout is trivial
//! on every platform.

use static_assertions::{assert_eq_align, assert_eq_size};

use crate::consts::{
    ADC_MAX_DEFAULT, ADC_MIN_DEFAULT, AVOID_STEER, COS_STRAIGHT, FAR_THRESHOLD_CM, KICK_POWER,
    LINEAR_A_DEFAULT, LINEAR_B_DEFAULT, NEAR_THRESHOLD_CM, POWER_GAIN, POWER_MAX, POWER_MIN,
    REVERSE_POWER, REVERSE_THRESHOLD_CM, SETPOINT_CM, STEER_INTEGRAL_LIMIT, STEER_KD, STEER_KI,
    STEER_KP, STEER_LIMIT, STEER_WINDOW_CM,
};
use crate::control::config::ControlConfig;
use crate::manifest::MANIFEST_VERSION;

/// Flattened control configuration for the native variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct NativeParams {
    /// Manifest version the block was built for.
    pub manifest_version: u32,

    // ── Linearization ──
    pub adc_min: u32,
    pub adc_max: u32,
    pub linear_a: u32,
    pub linear_b: u32,
    pub cos_straight: u32,

    // ── Propulsion law ──
    pub near_threshold_cm: u32,
    pub reverse_threshold_cm: u32,
    pub far_threshold_cm: u32,
    pub setpoint_cm: u32,
    pub power_gain: i32,
    pub power_min: i32,
    pub power_max: i32,
    pub kick_power: i32,
    pub reverse_power: i32,
    pub avoid_steer: i32,

    // ── Steering ──
    pub steer_kp: i32,
    pub steer_ki: i32,
    pub steer_kd: i32,
    pub steer_integral_limit: i32,
    pub steer_limit: i32,
    pub steer_window_cm: u32,
}

assert_eq_size!(NativeParams, [u32; 22]);
assert_eq_align!(NativeParams, u32);

impl NativeParams {
    /// Power-on parameters, identical to `ControlConfig::default()`.
    pub const DEFAULT: Self = Self {
        manifest_version: MANIFEST_VERSION,
        adc_min: ADC_MIN_DEFAULT as u32,
        adc_max: ADC_MAX_DEFAULT as u32,
        linear_a: LINEAR_A_DEFAULT,
        linear_b: LINEAR_B_DEFAULT,
        cos_straight: COS_STRAIGHT as u32,
        near_threshold_cm: NEAR_THRESHOLD_CM as u32,
        reverse_threshold_cm: REVERSE_THRESHOLD_CM as u32,
        far_threshold_cm: FAR_THRESHOLD_CM as u32,
        setpoint_cm: SETPOINT_CM as u32,
        power_gain: POWER_GAIN as i32,
        power_min: POWER_MIN as i32,
        power_max: POWER_MAX as i32,
        kick_power: KICK_POWER as i32,
        reverse_power: REVERSE_POWER as i32,
        avoid_steer: AVOID_STEER as i32,
        steer_kp: STEER_KP as i32,
        steer_ki: STEER_KI as i32,
        steer_kd: STEER_KD as i32,
        steer_integral_limit: STEER_INTEGRAL_LIMIT as i32,
        steer_limit: STEER_LIMIT as i32,
        steer_window_cm: STEER_WINDOW_CM as u32,
    };
}

impl Default for NativeParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<&ControlConfig> for NativeParams {
    fn from(config: &ControlConfig) -> Self {
        let lin = &config.linearization;
        let law = &config.law;
        let steering = &config.steering;
        Self {
            manifest_version: MANIFEST_VERSION,
            adc_min: lin.adc_min as u32,
            adc_max: lin.adc_max as u32,
            linear_a: lin.a,
            linear_b: lin.b,
            cos_straight: lin.cos_straight as u32,
            near_threshold_cm: law.near_threshold_cm as u32,
            reverse_threshold_cm: law.reverse_threshold_cm as u32,
            far_threshold_cm: law.far_threshold_cm as u32,
            setpoint_cm: law.setpoint_cm as u32,
            power_gain: law.power_gain as i32,
            power_min: law.power_min as i32,
            power_max: law.power_max as i32,
            kick_power: law.kick_power as i32,
            reverse_power: law.reverse_power as i32,
            avoid_steer: law.avoid_steer as i32,
            steer_kp: steering.kp as i32,
            steer_ki: steering.ki as i32,
            steer_kd: steering.kd as i32,
            steer_integral_limit: steering.integral_limit as i32,
            steer_limit: steering.limit as i32,
            steer_window_cm: steering.window_cm as u32,
        }
    }
}
