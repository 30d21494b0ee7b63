//! System-wide constants for the CrazyCar workspace.
//!
//! Single source of truth for calibration defaults, law defaults and the
//! integer widths of the fixed-point contract. The native library builds its
//! power-on parameter set from these values, so config defaults and native
//! defaults can never drift apart.

// ─── Sensor / Linearization ─────────────────────────────────────────

/// Largest raw sample a 10-bit ADC can deliver.
pub const ADC_RANGE_MAX: u16 = 1023;

/// Lower clamp for raw samples (protects the hyperbolic curve).
pub const ADC_MIN_DEFAULT: u16 = 163;

/// Upper clamp for raw samples.
pub const ADC_MAX_DEFAULT: u16 = 770;

/// Calibration constant `A` of `distance = A / (raw + B)`.
pub const LINEAR_A_DEFAULT: u32 = 23_962;

/// Calibration constant `B` of `distance = A / (raw + B)`.
pub const LINEAR_B_DEFAULT: u32 = 20;

/// `cos(0°) * 100`: the fixed angle factor of the front sensor.
pub const COS_STRAIGHT: u8 = 100;

/// Scale of angle factors and percent gains (100 == 1.0).
pub const PERCENT_SCALE: i32 = 100;

// ─── Fixed-Point Width Contract ─────────────────────────────────────

/// Saturation bound for control errors before they enter a block.
///
/// Errors are `i16`. With `|error| <= ERROR_LIMIT` and
/// `|gain| <= GAIN_LIMIT` every product fits `i32` and every block output
/// fits `i16`: `13_000 * 250 / 100 = 32_500`.
pub const ERROR_LIMIT: i16 = 13_000;

/// Largest accepted magnitude of any percent-scaled gain.
pub const GAIN_LIMIT: i16 = 250;

/// Fixed damping divisor of the derivative block.
pub const DERIVATIVE_DIVISOR: i32 = 2;

/// Largest propulsion magnitude a command may carry.
pub const POWER_LIMIT: i16 = 100;

/// Largest steering magnitude a command may carry.
pub const STEER_LIMIT_MAX: i16 = 100;

/// Allowed difference between native and interpreted commands.
///
/// Both variants truncate identically, so in-domain inputs agree exactly;
/// the tolerance covers a native build compiled from edited sources.
pub const COMMAND_TOLERANCE: i32 = 1;

// ─── Control Law Defaults ───────────────────────────────────────────

/// Any distance below this triggers avoidance [cm].
pub const NEAR_THRESHOLD_CM: u16 = 50;

/// While reversing, any distance below this keeps avoidance active [cm].
pub const REVERSE_THRESHOLD_CM: u16 = 80;

/// Front distance above this selects far tracking [cm].
pub const FAR_THRESHOLD_CM: u16 = 100;

/// Front distance the propulsion controller tracks [cm].
pub const SETPOINT_CM: u16 = 100;

/// Proportional propulsion gain [%].
pub const POWER_GAIN: i16 = 99;

/// Lowest forward propulsion while tracking (motor deadzone edge).
pub const POWER_MIN: i16 = 18;

/// Highest forward propulsion while tracking.
pub const POWER_MAX: i16 = 60;

/// Forward kick requested when tracking starts from reverse.
pub const KICK_POWER: i16 = 20;

/// Propulsion requested during avoidance.
pub const REVERSE_POWER: i16 = -20;

/// Steering magnitude during avoidance.
pub const AVOID_STEER: i16 = 10;

/// Proportional steering gain [%].
pub const STEER_KP: i16 = 37;

/// Integral steering gain [%] (0 disables).
pub const STEER_KI: i16 = 0;

/// Derivative steering gain [%] (0 disables).
pub const STEER_KD: i16 = 0;

/// Anti-windup bound of the steering integrator.
pub const STEER_INTEGRAL_LIMIT: i16 = 1_000;

/// Steering command saturation.
pub const STEER_LIMIT: i16 = 10;

/// Steering engages only while a side is closer than this [cm].
pub const STEER_WINDOW_CM: u16 = 130;

// ─── Runtime Defaults ───────────────────────────────────────────────

/// Default control tick period in milliseconds.
pub const CYCLE_PERIOD_MS: u64 = 10;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/car.toml";

/// Package name of the native control law library.
pub const NATIVE_PACKAGE: &str = "car_native";
