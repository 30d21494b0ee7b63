//! Configuration structures for the control core.
//!
//! All config types use `serde::Deserialize` for TOML loading and default
//! every field, so an empty file yields the calibrated defaults from
//! [`crate::consts`]. [`ControlConfig::validate`] enforces the bounds that
//! keep both control-law variants inside their integer widths.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    ADC_MAX_DEFAULT, ADC_MIN_DEFAULT, ADC_RANGE_MAX, AVOID_STEER, COS_STRAIGHT, CYCLE_PERIOD_MS,
    ERROR_LIMIT, FAR_THRESHOLD_CM, GAIN_LIMIT, KICK_POWER, LINEAR_A_DEFAULT, LINEAR_B_DEFAULT,
    NATIVE_PACKAGE, NEAR_THRESHOLD_CM, POWER_GAIN, POWER_LIMIT, POWER_MAX, POWER_MIN,
    REVERSE_POWER, REVERSE_THRESHOLD_CM, SETPOINT_CM, STEER_INTEGRAL_LIMIT, STEER_KD, STEER_KI,
    STEER_KP, STEER_LIMIT, STEER_LIMIT_MAX, STEER_WINDOW_CM,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level control core configuration.
///
/// Loaded from TOML at startup and immutable while the loop runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// Logging and instance identification.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Sensor linearization calibration.
    #[serde(default)]
    pub linearization: LinearizationConfig,
    /// Propulsion thresholds, setpoint and bounds.
    #[serde(default)]
    pub law: LawConfig,
    /// Steering PID gains and limits.
    #[serde(default)]
    pub steering: SteeringConfig,
    /// Variant selection policy.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Native build and artifact location.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Actuation model used by the replay harness.
    #[serde(default)]
    pub actuation: ActuationConfig,
    /// Tick pacing.
    #[serde(default)]
    pub cycle: CycleConfig,
}

impl ControlConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.linearization.validate()?;
        self.law.validate()?;
        self.steering.validate()?;
        self.actuation.validate()?;
        self.cycle.validate()?;
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

fn check_gain(name: &str, gain: i16) -> Result<(), ConfigError> {
    if gain.unsigned_abs() > GAIN_LIMIT as u16 {
        return Err(invalid(format!(
            "{name} {gain} out of range [-{GAIN_LIMIT}, {GAIN_LIMIT}]"
        )));
    }
    Ok(())
}

fn check_power(name: &str, power: i16) -> Result<(), ConfigError> {
    if power.unsigned_abs() > POWER_LIMIT as u16 {
        return Err(invalid(format!(
            "{name} {power} out of range [-{POWER_LIMIT}, {POWER_LIMIT}]"
        )));
    }
    Ok(())
}

// ─── Linearization ──────────────────────────────────────────────────

/// Calibration of `distance_cm = (A / (raw + B)) * 100 / angle_factor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearizationConfig {
    /// Lower raw clamp.
    pub adc_min: u16,
    /// Upper raw clamp.
    pub adc_max: u16,
    /// Curve numerator `A`.
    pub a: u32,
    /// Curve offset `B`.
    pub b: u32,
    /// Angle factor of the straight-ahead (front) sensor.
    pub cos_straight: u8,
}

impl Default for LinearizationConfig {
    fn default() -> Self {
        Self {
            adc_min: ADC_MIN_DEFAULT,
            adc_max: ADC_MAX_DEFAULT,
            a: LINEAR_A_DEFAULT,
            b: LINEAR_B_DEFAULT,
            cos_straight: COS_STRAIGHT,
        }
    }
}

impl LinearizationConfig {
    /// Largest distance the calibration can produce (angle factor 1).
    pub fn max_distance_cm(&self) -> u64 {
        let denominator = self.adc_min as u64 + self.b as u64;
        if denominator == 0 {
            return u64::MAX;
        }
        (self.a as u64 / denominator) * 100
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adc_min > self.adc_max {
            return Err(invalid(format!(
                "adc_min {} greater than adc_max {}",
                self.adc_min, self.adc_max
            )));
        }
        if self.adc_max > ADC_RANGE_MAX {
            return Err(invalid(format!(
                "adc_max {} out of range [0, {ADC_RANGE_MAX}]",
                self.adc_max
            )));
        }
        if self.a == 0 {
            return Err(invalid("linearization constant a must be positive".into()));
        }
        // Same domain as the native parameter check; bounds `adc_min + b` too.
        if (self.adc_max as u32).checked_add(self.b).is_none() {
            return Err(invalid(format!(
                "adc_max {} + b {} overflows u32",
                self.adc_max, self.b
            )));
        }
        if self.adc_min as u32 + self.b == 0 {
            return Err(invalid("adc_min + b must be positive".into()));
        }
        let max_cm = self.max_distance_cm();
        if max_cm > u16::MAX as u64 {
            return Err(invalid(format!(
                "calibration yields up to {max_cm} cm, exceeding {} cm",
                u16::MAX
            )));
        }
        if self.cos_straight == 0 {
            return Err(invalid("cos_straight must be positive".into()));
        }
        Ok(())
    }
}

// ─── Control Law ────────────────────────────────────────────────────

/// Propulsion law parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LawConfig {
    /// Avoidance when any distance is below this [cm].
    pub near_threshold_cm: u16,
    /// Avoidance while reversing when any distance is below this [cm].
    pub reverse_threshold_cm: u16,
    /// Far tracking when the front distance exceeds this [cm].
    pub far_threshold_cm: u16,
    /// Tracked front distance [cm].
    pub setpoint_cm: u16,
    /// Proportional propulsion gain [%].
    pub power_gain: i16,
    /// Lower propulsion bound while tracking.
    pub power_min: i16,
    /// Upper propulsion bound while tracking.
    pub power_max: i16,
    /// Forward kick when tracking starts from reverse.
    pub kick_power: i16,
    /// Propulsion during avoidance.
    pub reverse_power: i16,
    /// Steering magnitude during avoidance.
    pub avoid_steer: i16,
}

impl Default for LawConfig {
    fn default() -> Self {
        Self {
            near_threshold_cm: NEAR_THRESHOLD_CM,
            reverse_threshold_cm: REVERSE_THRESHOLD_CM,
            far_threshold_cm: FAR_THRESHOLD_CM,
            setpoint_cm: SETPOINT_CM,
            power_gain: POWER_GAIN,
            power_min: POWER_MIN,
            power_max: POWER_MAX,
            kick_power: KICK_POWER,
            reverse_power: REVERSE_POWER,
            avoid_steer: AVOID_STEER,
        }
    }
}

impl LawConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near_threshold_cm > self.reverse_threshold_cm {
            return Err(invalid(format!(
                "near_threshold_cm {} greater than reverse_threshold_cm {}",
                self.near_threshold_cm, self.reverse_threshold_cm
            )));
        }
        if self.near_threshold_cm > self.far_threshold_cm {
            return Err(invalid(format!(
                "near_threshold_cm {} greater than far_threshold_cm {}",
                self.near_threshold_cm, self.far_threshold_cm
            )));
        }
        check_gain("power_gain", self.power_gain)?;
        check_power("power_min", self.power_min)?;
        check_power("power_max", self.power_max)?;
        check_power("kick_power", self.kick_power)?;
        check_power("reverse_power", self.reverse_power)?;
        if self.power_min > self.power_max {
            return Err(invalid(format!(
                "power_min {} greater than power_max {}",
                self.power_min, self.power_max
            )));
        }
        if self.reverse_power >= 0 {
            return Err(invalid(format!(
                "reverse_power {} must be negative",
                self.reverse_power
            )));
        }
        if self.kick_power <= 0 {
            return Err(invalid(format!(
                "kick_power {} must be positive",
                self.kick_power
            )));
        }
        if self.avoid_steer < 0 || self.avoid_steer > STEER_LIMIT_MAX {
            return Err(invalid(format!(
                "avoid_steer {} out of range [0, {STEER_LIMIT_MAX}]",
                self.avoid_steer
            )));
        }
        Ok(())
    }
}

// ─── Steering ───────────────────────────────────────────────────────

/// Steering PID on the right/left clearance difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteeringConfig {
    /// Proportional gain [%].
    pub kp: i16,
    /// Integral gain [%] (0 disables).
    pub ki: i16,
    /// Derivative gain [%] (0 disables).
    pub kd: i16,
    /// Anti-windup bound of the integrator.
    pub integral_limit: i16,
    /// Steering command saturation.
    pub limit: i16,
    /// Steering engages while either side is closer than this [cm].
    pub window_cm: u16,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            kp: STEER_KP,
            ki: STEER_KI,
            kd: STEER_KD,
            integral_limit: STEER_INTEGRAL_LIMIT,
            limit: STEER_LIMIT,
            window_cm: STEER_WINDOW_CM,
        }
    }
}

impl SteeringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_gain("steering.kp", self.kp)?;
        check_gain("steering.ki", self.ki)?;
        check_gain("steering.kd", self.kd)?;
        if self.integral_limit < 0 || self.integral_limit > ERROR_LIMIT {
            return Err(invalid(format!(
                "integral_limit {} out of range [0, {ERROR_LIMIT}]",
                self.integral_limit
            )));
        }
        if self.limit < 0 || self.limit > STEER_LIMIT_MAX {
            return Err(invalid(format!(
                "steering limit {} out of range [0, {STEER_LIMIT_MAX}]",
                self.limit
            )));
        }
        Ok(())
    }
}

// ─── Bridge ─────────────────────────────────────────────────────────

/// Variant selection policy of the controller bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Use the native variant whenever it is verified.
    pub prefer_native: bool,
    /// Refuse to start unless the native variant is usable.
    pub require_native: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            prefer_native: true,
            require_native: false,
        }
    }
}

// ─── Verifier ───────────────────────────────────────────────────────

/// Native build command and artifact location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Build program.
    pub program: String,
    /// Build program arguments.
    pub args: Vec<String>,
    /// Directory the build runs in (workspace root).
    pub working_dir: Option<PathBuf>,
    /// Explicit artifact path; derived from `working_dir` when absent.
    pub artifact: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: ["build", "-p", NATIVE_PACKAGE, "--release"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            working_dir: None,
            artifact: None,
        }
    }
}

impl VerifierConfig {
    /// Platform file name of the native library.
    pub fn artifact_file_name() -> String {
        format!("{DLL_PREFIX}{NATIVE_PACKAGE}{DLL_SUFFIX}")
    }

    /// Resolved artifact path.
    pub fn artifact_path(&self) -> PathBuf {
        if let Some(ref artifact) = self.artifact {
            return artifact.clone();
        }
        self.working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("target")
            .join("release")
            .join(Self::artifact_file_name())
    }
}

// ─── Actuation ──────────────────────────────────────────────────────

/// Motor and servo model of the replay actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuationConfig {
    /// Requests with `|power| < deadzone` leave the motor stopped.
    pub deadzone: f64,
    /// Minimal start power as a fraction of `max_power`.
    pub min_start_fraction: f64,
    /// Largest power magnitude the motor accepts.
    pub max_power: f64,
    /// Steering clip, left edge [deg].
    pub steer_min_deg: f64,
    /// Steering clip, right edge [deg].
    pub steer_max_deg: f64,
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            deadzone: 18.0,
            min_start_fraction: 0.08,
            max_power: POWER_LIMIT as f64,
            steer_min_deg: -10.0,
            steer_max_deg: 10.0,
        }
    }
}

impl ActuationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_power > 0.0) {
            return Err(invalid(format!(
                "max_power {} must be positive",
                self.max_power
            )));
        }
        if !(0.0..=self.max_power).contains(&self.deadzone) {
            return Err(invalid(format!(
                "deadzone {} out of range [0, {}]",
                self.deadzone, self.max_power
            )));
        }
        if !(0.0..1.0).contains(&self.min_start_fraction) {
            return Err(invalid(format!(
                "min_start_fraction {} out of range [0, 1)",
                self.min_start_fraction
            )));
        }
        if !(self.steer_min_deg < self.steer_max_deg) {
            return Err(invalid(format!(
                "steer_min_deg {} must be below steer_max_deg {}",
                self.steer_min_deg, self.steer_max_deg
            )));
        }
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Tick pacing of the cycle runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Tick period [ms]; 0 runs unpaced.
    pub period_ms: u64,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period_ms: CYCLE_PERIOD_MS,
            max_ticks: None,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms > 10_000 {
            return Err(invalid(format!(
                "period_ms {} out of range [0, 10000]",
                self.period_ms
            )));
        }
        if self.max_ticks == Some(0) {
            return Err(invalid("max_ticks must be positive when set".into()));
        }
        Ok(())
    }
}
