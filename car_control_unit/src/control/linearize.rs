//! Sensor linearization.
//!
//! `distance_cm = (A / (raw + B)) * 100 / angle_factor`, evaluated in `u32`
//! with truncating division. Raw samples are clamped to the calibrated ADC
//! window first; an angle factor of 0 is replaced by 1.

use car_common::consts::PERCENT_SCALE;
use car_common::control::config::LinearizationConfig;
use car_common::control::state::{Distances, SensorChannel, SensorFrame};
use tracing::warn;

/// Calibrated raw-sample → distance converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linearizer {
    adc_min: u16,
    adc_max: u16,
    a: u32,
    b: u32,
    cos_straight: u8,
}

impl Linearizer {
    /// Build from a validated calibration.
    pub fn new(config: &LinearizationConfig) -> Self {
        Self {
            adc_min: config.adc_min,
            adc_max: config.adc_max,
            a: config.a,
            b: config.b,
            cos_straight: config.cos_straight,
        }
    }

    /// Convert one raw sample [cm].
    pub fn linearize(&self, raw: u16, angle_factor: u8) -> u16 {
        let angle = if angle_factor == 0 {
            warn!(raw, "angle factor 0 substituted by 1");
            1
        } else {
            angle_factor as u32
        };
        let raw = raw.max(self.adc_min).min(self.adc_max) as u32;
        // Saturation only triggers for calibrations that fail validation.
        let denominator = raw.saturating_add(self.b).max(1);
        let cm = (self.a / denominator) * PERCENT_SCALE as u32 / angle;
        cm.min(u16::MAX as u32) as u16
    }

    /// Convert the sample of one channel. The front channel always uses the
    /// straight-ahead factor.
    pub fn channel(&self, channel: SensorChannel, raw: u16, side_angle_factor: u8) -> u16 {
        match channel {
            SensorChannel::Front => self.linearize(raw, self.cos_straight),
            SensorChannel::Left | SensorChannel::Right => self.linearize(raw, side_angle_factor),
        }
    }

    /// Convert a full sensor frame.
    pub fn frame(&self, frame: &SensorFrame) -> Distances {
        Distances {
            front: self.channel(SensorChannel::Front, frame.front_raw, frame.side_angle_factor),
            left: self.channel(SensorChannel::Left, frame.left_raw, frame.side_angle_factor),
            right: self.channel(SensorChannel::Right, frame.right_raw, frame.side_angle_factor),
        }
    }
}

impl Default for Linearizer {
    fn default() -> Self {
        Self::new(&LinearizationConfig::default())
    }
}

/// `round(cos(deg) * 100)` clamped to `[1, 255]`.
pub fn angle_factor_from_degrees(deg: f64) -> u8 {
    let factor = (deg.to_radians().cos() * PERCENT_SCALE as f64).round();
    if !factor.is_finite() {
        return 1;
    }
    factor.clamp(1.0, u8::MAX as f64) as u8
}
