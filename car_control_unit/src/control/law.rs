//! Interpreted control law.
//!
//! Priority order per tick:
//!
//! | Mode | Condition | Propulsion |
//! |------|-----------|------------|
//! | Avoidance | any distance < near, or reversing and any distance < reverse | `reverse_power` |
//! | FarTracking | front > far | kick if reversing, else `power + P(front - setpoint)` |
//! | NearTracking | otherwise | kick if reversing, else `power - P(setpoint - front)` |
//!
//! Tracking propulsion is clamped to `[power_min, power_max]`. Outside
//! avoidance the steering PID acts on `right - left` while either side is
//! inside the steering window. Positive steering is to the right.

use car_common::control::config::{ControlConfig, LawConfig};
use car_common::control::state::{Commands, Distances, DriveMode, LawOutput, TickInput};
use tracing::debug;

use crate::control::blocks::{PidGains, PidState, pid_compute, proportional, saturate};
use crate::control::linearize::Linearizer;
use crate::variant::{ControlLaw, LawError, VariantKind};

/// Law parameters widened once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LawParams {
    near: i64,
    reverse: i64,
    far: i64,
    setpoint: i64,
    power_gain: i64,
    power_min: i64,
    power_max: i64,
    kick_power: i64,
    reverse_power: i64,
    avoid_steer: i64,
}

impl From<&LawConfig> for LawParams {
    fn from(law: &LawConfig) -> Self {
        Self {
            near: law.near_threshold_cm as i64,
            reverse: law.reverse_threshold_cm as i64,
            far: law.far_threshold_cm as i64,
            setpoint: law.setpoint_cm as i64,
            power_gain: law.power_gain as i64,
            power_min: law.power_min as i64,
            power_max: law.power_max as i64,
            kick_power: law.kick_power as i64,
            reverse_power: law.reverse_power as i64,
            avoid_steer: law.avoid_steer as i64,
        }
    }
}

/// In-process reference implementation of the control law.
#[derive(Debug, Clone)]
pub struct InterpretedLaw {
    linearizer: Linearizer,
    law: LawParams,
    steer_gains: PidGains,
    steer_limit: i64,
    steer_window: i64,
    steer_state: PidState,
}

impl InterpretedLaw {
    /// Build from a validated configuration.
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            linearizer: Linearizer::new(&config.linearization),
            law: LawParams::from(&config.law),
            steer_gains: PidGains::from(&config.steering),
            steer_limit: config.steering.limit as i64,
            steer_window: config.steering.window_cm as i64,
            steer_state: PidState::default(),
        }
    }

    pub fn linearizer(&self) -> &Linearizer {
        &self.linearizer
    }

    /// Evaluate the law on already linearized distances.
    pub fn evaluate(&mut self, distances: Distances, current_power: i8) -> (Commands, DriveMode) {
        let p = self.law;
        let power = current_power as i64;
        let front = distances.front as i64;
        let left = distances.left as i64;
        let right = distances.right as i64;
        let closest = distances.min() as i64;

        if closest < p.near || (power < 0 && closest < p.reverse) {
            self.steer_state.reset();
            let steer = if right >= left {
                p.avoid_steer
            } else {
                -p.avoid_steer
            };
            return (commands(p.reverse_power, steer), DriveMode::Avoidance);
        }

        let (mode, power_command) = if front > p.far {
            let command = if power < 0 {
                p.kick_power
            } else {
                let error = saturate(front - p.setpoint);
                (power + proportional(error, p.power_gain)).clamp(p.power_min, p.power_max)
            };
            (DriveMode::FarTracking, command)
        } else {
            let command = if power < 0 {
                p.kick_power
            } else {
                let error = saturate(p.setpoint - front);
                (power - proportional(error, p.power_gain)).clamp(p.power_min, p.power_max)
            };
            (DriveMode::NearTracking, command)
        };

        let steer = self.steer(left, right);
        (commands(power_command, steer), mode)
    }

    fn steer(&mut self, left: i64, right: i64) -> i64 {
        if left >= self.steer_window && right >= self.steer_window {
            self.steer_state.reset();
            return 0;
        }
        let error = saturate(right - left);
        pid_compute(&mut self.steer_state, &self.steer_gains, error)
            .clamp(-self.steer_limit, self.steer_limit)
    }
}

// Every path clamps to configured bounds that fit i16.
fn commands(power: i64, steer: i64) -> Commands {
    Commands {
        power: power as i32,
        steer: steer as i32,
    }
}

impl ControlLaw for InterpretedLaw {
    fn kind(&self) -> VariantKind {
        VariantKind::Interpreted
    }

    fn step(&mut self, input: &TickInput) -> Result<LawOutput, LawError> {
        let distances = self.linearizer.frame(&input.frame);
        let (commands, mode) = self.evaluate(distances, input.feedback.power);
        debug!(
            ?mode,
            power = commands.power,
            steer = commands.steer,
            front = distances.front,
            left = distances.left,
            right = distances.right,
            "interpreted tick"
        );
        Ok(LawOutput {
            commands,
            distances,
            mode,
        })
    }

    fn reset(&mut self) {
        self.steer_state.reset();
    }
}
