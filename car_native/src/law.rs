//! Native control law state and tick evaluation.

use car_common::control::state::{Distances, DriveMode, SensorChannel};

use crate::fixed::{FixedParams, derivative, integral, linearize, proportional, saturate};

/// Integrator and previous error of the steering PID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SteerMemory {
    acc: i16,
    prev: i16,
}

impl SteerMemory {
    const ZERO: Self = Self { acc: 0, prev: 0 };

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }
}

/// Everything the native library remembers between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeState {
    params: FixedParams,
    power_feedback: i8,
    steer_feedback: i8,
    distances: Distances,
    power_command: i16,
    steer_command: i16,
    mode: DriveMode,
    steering: SteerMemory,
}

impl NativeState {
    /// State at library load.
    pub const POWER_ON: Self = Self {
        params: FixedParams::POWER_ON,
        power_feedback: 0,
        steer_feedback: 0,
        distances: Distances {
            front: 0,
            left: 0,
            right: 0,
        },
        power_command: 0,
        steer_command: 0,
        mode: DriveMode::Idle,
        steering: SteerMemory::ZERO,
    };

    /// Replace the parameters and clear all tick memory.
    pub fn configure(&mut self, params: FixedParams) {
        *self = Self {
            params,
            ..Self::POWER_ON
        };
    }

    pub fn params(&self) -> &FixedParams {
        &self.params
    }

    pub fn set_power_feedback(&mut self, power: i8) {
        self.power_feedback = power;
    }

    pub fn power_feedback(&self) -> i8 {
        self.power_feedback
    }

    pub fn set_steer_feedback(&mut self, angle: i8) {
        self.steer_feedback = angle;
    }

    pub fn steer_feedback(&self) -> i8 {
        self.steer_feedback
    }

    /// Linearize and store one channel. The front channel ignores
    /// `angle_factor` and uses the straight-ahead factor.
    pub fn ingest(&mut self, channel: SensorChannel, raw: u16, angle_factor: u8) {
        let angle = match channel {
            SensorChannel::Front => self.params.cos_straight,
            SensorChannel::Left | SensorChannel::Right => angle_factor,
        };
        *self.distances.get_mut(channel) = linearize(raw, angle, &self.params);
    }

    pub fn distances(&self) -> Distances {
        self.distances
    }

    pub fn power_command(&self) -> i16 {
        self.power_command
    }

    pub fn steer_command(&self) -> i16 {
        self.steer_command
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Evaluate one tick from the stored distances and feedback.
    pub fn step(&mut self) {
        let p = self.params;
        let d = self.distances;
        let power = self.power_feedback as i16;
        let closest = d.min();

        if closest < p.near_threshold_cm || (power < 0 && closest < p.reverse_threshold_cm) {
            self.mode = DriveMode::Avoidance;
            self.power_command = p.reverse_power;
            self.steer_command = if d.right >= d.left {
                p.avoid_steer
            } else {
                -p.avoid_steer
            };
            self.steering.reset();
            return;
        }

        if d.front > p.far_threshold_cm {
            self.mode = DriveMode::FarTracking;
            self.power_command = if power < 0 {
                p.kick_power
            } else {
                let error = saturate(d.front as i32 - p.setpoint_cm as i32);
                track(power, proportional(error, p.power_gain), &p)
            };
        } else {
            self.mode = DriveMode::NearTracking;
            self.power_command = if power < 0 {
                p.kick_power
            } else {
                let error = saturate(p.setpoint_cm as i32 - d.front as i32);
                track(power, -proportional(error, p.power_gain), &p)
            };
        }

        self.steer_command = self.steer(d);
    }

    fn steer(&mut self, d: Distances) -> i16 {
        let p = &self.params;
        if d.left >= p.steer_window_cm && d.right >= p.steer_window_cm {
            self.steering.reset();
            return 0;
        }
        let memory = &mut self.steering;
        let error = saturate(d.right as i32 - d.left as i32);
        let out = proportional(error, p.steer_kp) as i32
            + integral(&mut memory.acc, error, p.steer_ki, p.steer_integral_limit) as i32
            + derivative(memory.prev, error, p.steer_kd) as i32;
        memory.prev = error;
        let limit = p.steer_limit as i32;
        out.clamp(-limit, limit) as i16
    }
}

#[inline]
fn track(power: i16, correction: i16, p: &FixedParams) -> i16 {
    (power as i32 + correction as i32).clamp(p.power_min as i32, p.power_max as i32) as i16
}
