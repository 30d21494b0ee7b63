//! Shared control state and per-tick value types.
//!
//! `SharedControlState` is the single context object both control-law
//! variants are evaluated against. The controller bridge owns it and is its
//! only writer; variants receive a [`TickInput`] and hand back a
//! [`LawOutput`].

use serde::{Deserialize, Serialize};

/// Control-law state selected on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum DriveMode {
    /// No tick has run yet.
    #[default]
    Idle = 0,
    /// Obstacle close: reverse and steer toward the larger clearance.
    Avoidance = 1,
    /// Front clear beyond the far threshold: accelerate toward the setpoint.
    FarTracking = 2,
    /// Front between near and far thresholds: decelerate toward the setpoint.
    NearTracking = 3,
}

impl DriveMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Avoidance),
            2 => Some(Self::FarTracking),
            3 => Some(Self::NearTracking),
            _ => None,
        }
    }
}

/// Distance sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorChannel {
    /// Straight ahead; always ingested with the fixed straight angle factor.
    Front,
    /// Left side sensor.
    Left,
    /// Right side sensor.
    Right,
}

/// Linearized distances [cm].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Distances {
    pub front: u16,
    pub left: u16,
    pub right: u16,
}

impl Distances {
    /// Smallest of the three distances.
    #[inline]
    pub fn min(&self) -> u16 {
        self.front.min(self.left).min(self.right)
    }

    /// Distance of one channel.
    #[inline]
    pub fn get(&self, channel: SensorChannel) -> u16 {
        match channel {
            SensorChannel::Front => self.front,
            SensorChannel::Left => self.left,
            SensorChannel::Right => self.right,
        }
    }

    /// Mutable distance of one channel.
    #[inline]
    pub fn get_mut(&mut self, channel: SensorChannel) -> &mut u16 {
        match channel {
            SensorChannel::Front => &mut self.front,
            SensorChannel::Left => &mut self.left,
            SensorChannel::Right => &mut self.right,
        }
    }
}

/// Raw samples of one tick as delivered by the sensor collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Front raw ADC sample.
    pub front_raw: u16,
    /// Left raw ADC sample.
    pub left_raw: u16,
    /// Right raw ADC sample.
    pub right_raw: u16,
    /// `cos(θ) * 100` of the side sensors.
    pub side_angle_factor: u8,
}

impl Default for SensorFrame {
    fn default() -> Self {
        Self {
            front_raw: 0,
            left_raw: 0,
            right_raw: 0,
            side_angle_factor: crate::consts::COS_STRAIGHT,
        }
    }
}

/// Actuator feedback read before a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// Currently applied propulsion.
    pub power: i8,
    /// Currently applied steering angle.
    pub steer_angle: i8,
}

impl Feedback {
    /// Build feedback from actuator readings, saturating into `i8`.
    pub fn saturating(power: i32, steer_angle: i32) -> Self {
        Self {
            power: power.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            steer_angle: steer_angle.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
        }
    }
}

/// Propulsion and steering commands of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commands {
    pub power: i32,
    pub steer: i32,
}

impl Commands {
    /// Largest per-component difference to another command pair.
    #[inline]
    pub fn max_deviation(&self, other: &Commands) -> i32 {
        (self.power - other.power)
            .abs()
            .max((self.steer - other.steer).abs())
    }
}

/// Everything a control-law variant needs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickInput {
    pub frame: SensorFrame,
    pub feedback: Feedback,
}

/// Result of one control-law tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LawOutput {
    pub commands: Commands,
    pub distances: Distances,
    pub mode: DriveMode,
}

/// Process-wide control state of one vehicle.
///
/// Zero/neutral at start, rewritten every tick by the controller bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SharedControlState {
    /// Propulsion command of the last tick.
    pub power_command: i32,
    /// Steering command of the last tick.
    pub steer_command: i32,
    /// Propulsion feedback the last tick was computed from.
    pub current_power: i8,
    /// Steering feedback the last tick was computed from.
    pub current_steer_angle: i8,
    /// Linearized front distance [cm].
    pub distance_front: u16,
    /// Linearized left distance [cm].
    pub distance_left: u16,
    /// Linearized right distance [cm].
    pub distance_right: u16,
    /// Law state selected on the last tick.
    pub mode: DriveMode,
    /// Completed ticks.
    pub tick: u64,
}

impl SharedControlState {
    /// Distances as a value type.
    #[inline]
    pub fn distances(&self) -> Distances {
        Distances {
            front: self.distance_front,
            left: self.distance_left,
            right: self.distance_right,
        }
    }

    /// Commands as a value type.
    #[inline]
    pub fn commands(&self) -> Commands {
        Commands {
            power: self.power_command,
            steer: self.steer_command,
        }
    }

    /// Record a completed tick.
    pub fn commit(&mut self, input: &TickInput, output: &LawOutput) {
        self.current_power = input.feedback.power;
        self.current_steer_angle = input.feedback.steer_angle;
        self.distance_front = output.distances.front;
        self.distance_left = output.distances.left;
        self.distance_right = output.distances.right;
        self.power_command = output.commands.power;
        self.steer_command = output.commands.steer;
        self.mode = output.mode;
        self.tick += 1;
    }
}
