//! Actuation collaborator.
//!
//! The bridge hands every tick's commands to an [`Actuator`] exactly once
//! and reads feedback from it before the next tick. [`SimActuator`] models
//! the vehicle's motor and servo for replay runs: a propulsion deadzone,
//! a minimal start power, a brake pulse before reversing out of forward
//! motion, and a clipped steering servo.

use car_common::control::config::ActuationConfig;
use car_common::control::state::{Commands, Feedback};
use tracing::debug;

/// Counter-thrust applied briefly when reversing out of forward motion.
const BRAKE_PULSE_POWER: f64 = -30.0;

/// Motor and steering servo of one vehicle.
pub trait Actuator {
    /// Request propulsion (`-100..=100`, negative is reverse).
    fn set_propulsion(&mut self, power: i32);

    /// Currently applied propulsion.
    fn propulsion(&self) -> i32;

    /// Request steering (positive is right).
    fn set_steering(&mut self, steer: i32);

    /// Currently applied steering.
    fn steering(&self) -> i32;

    /// Feedback for the next tick.
    fn feedback(&self) -> Feedback {
        Feedback::saturating(self.propulsion(), self.steering())
    }
}

/// Servo setpoint → wheel angle [deg], `0.03x² + 0.97x + 2.23`, odd in `x`.
pub fn servo_to_angle(servo: f64) -> f64 {
    if servo == 0.0 {
        return 0.0;
    }
    let x = servo.abs();
    let angle = 0.03 * x * x + 0.97 * x + 2.23;
    angle.copysign(servo)
}

/// Clamp a steering request to `[min_deg, max_deg]`.
pub fn clip_steer(steer: f64, min_deg: f64, max_deg: f64) -> f64 {
    if steer == 0.0 {
        return 0.0;
    }
    steer.clamp(min_deg, max_deg)
}

/// Simulated motor and servo.
#[derive(Debug, Clone)]
pub struct SimActuator {
    config: ActuationConfig,
    power: f64,
    steer: f64,
    brake_pulses: u64,
    last_commands: Option<Commands>,
}

impl SimActuator {
    pub fn new(config: ActuationConfig) -> Self {
        Self {
            config,
            power: 0.0,
            steer: 0.0,
            brake_pulses: 0,
            last_commands: None,
        }
    }

    /// Applied motor power.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Wheel angle of the applied steering [deg].
    pub fn wheel_angle_deg(&self) -> f64 {
        servo_to_angle(self.steer)
    }

    /// Brake pulses issued so far.
    pub fn brake_pulses(&self) -> u64 {
        self.brake_pulses
    }

    /// Commands as last requested, before the motor model.
    pub fn last_commands(&self) -> Option<Commands> {
        self.last_commands
    }

    fn map_power(&mut self, request: f64) -> f64 {
        let ActuationConfig {
            deadzone,
            min_start_fraction,
            max_power,
            ..
        } = self.config;

        if request.abs() < deadzone {
            return 0.0;
        }
        if (deadzone..=max_power).contains(&request) {
            let min_start = max_power * min_start_fraction;
            return if request < min_start { min_start } else { request };
        }
        if (-max_power..=-deadzone).contains(&request) {
            if self.power > 0.0 {
                self.brake_pulses += 1;
                debug!(
                    from = self.power,
                    pulse = BRAKE_PULSE_POWER,
                    "brake pulse before reverse"
                );
            }
            return request;
        }
        // outside the motor range: keep the current power
        self.power
    }
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new(ActuationConfig::default())
    }
}

impl Actuator for SimActuator {
    fn set_propulsion(&mut self, power: i32) {
        let request = power as f64;
        self.power = self.map_power(request);
        let last = self.last_commands.get_or_insert_with(Commands::default);
        last.power = power;
    }

    fn propulsion(&self) -> i32 {
        self.power.round() as i32
    }

    fn set_steering(&mut self, steer: i32) {
        self.steer = clip_steer(
            steer as f64,
            self.config.steer_min_deg,
            self.config.steer_max_deg,
        );
        let last = self.last_commands.get_or_insert_with(Commands::default);
        last.steer = steer;
    }

    fn steering(&self) -> i32 {
        self.steer.round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_curve_is_odd() {
        assert_eq!(servo_to_angle(0.0), 0.0);
        assert!((servo_to_angle(10.0) - 14.93).abs() < 1e-9);
        assert_eq!(servo_to_angle(-10.0), -servo_to_angle(10.0));
    }

    #[test]
    fn clip_limits_steering() {
        assert_eq!(clip_steer(25.0, -10.0, 10.0), 10.0);
        assert_eq!(clip_steer(-25.0, -10.0, 10.0), -10.0);
        assert_eq!(clip_steer(4.0, -10.0, 10.0), 4.0);
    }

    #[test]
    fn deadzone_stops_motor() {
        let mut act = SimActuator::default();
        act.set_propulsion(17);
        assert_eq!(act.propulsion(), 0);
        act.set_propulsion(-17);
        assert_eq!(act.propulsion(), 0);
    }

    #[test]
    fn forward_and_reverse_pass_through() {
        let mut act = SimActuator::default();
        act.set_propulsion(29);
        assert_eq!(act.propulsion(), 29);
        act.set_propulsion(-20);
        assert_eq!(act.propulsion(), -20);
        assert_eq!(act.brake_pulses(), 1);
    }

    #[test]
    fn min_start_lifts_weak_requests() {
        let mut act = SimActuator::new(ActuationConfig {
            deadzone: 5.0,
            min_start_fraction: 0.1,
            ..Default::default()
        });
        act.set_propulsion(6);
        assert_eq!(act.propulsion(), 10);
    }

    #[test]
    fn out_of_range_request_keeps_power() {
        let mut act = SimActuator::default();
        act.set_propulsion(40);
        act.set_propulsion(150);
        assert_eq!(act.propulsion(), 40);
        assert_eq!(
            act.last_commands(),
            Some(Commands {
                power: 150,
                steer: 0
            })
        );
    }

    #[test]
    fn feedback_reflects_applied_values() {
        let mut act = SimActuator::default();
        act.set_propulsion(-20);
        act.set_steering(30);
        assert_eq!(
            act.feedback(),
            Feedback {
                power: -20,
                steer_angle: 10
            }
        );
        assert!(act.wheel_angle_deg() > 10.0);
    }
}
