//! PID velocity controller
//!
//! Closes the loop from target RPM to actuator duty. The control period is
//! fixed, so `dt` is a configuration constant rather than a measured
//! interval.

use twinwheel_protocol::Gains;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output range of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OutputPolicy {
    /// `[0, max]`; the loop works on speed magnitudes and the target sign
    /// picks the direction
    #[default]
    Unipolar,
    /// `[-max, max]`; the loop works on signed speeds
    Bipolar,
}

/// Controller mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerMode {
    /// Target is zero: output held at zero, integral cleared
    #[default]
    Idle,
    /// Tracking a non-zero target
    Tracking,
}

/// PID controller state
#[derive(Debug, Clone)]
pub struct VelocityController {
    gains: Gains,
    policy: OutputPolicy,
    output_max: f32,
    dt_s: f32,
    mode: ControllerMode,
    integral: f32,
    prev_error: f32,
    output: f32,
}

impl VelocityController {
    /// Create a controller
    ///
    /// `dt_s` is the control period in seconds and must be positive.
    pub fn new(gains: Gains, policy: OutputPolicy, output_max: f32, dt_s: f32) -> Self {
        Self {
            gains,
            policy,
            output_max: if output_max > 0.0 { output_max } else { 0.0 },
            dt_s,
            mode: ControllerMode::Idle,
            integral: 0.0,
            prev_error: 0.0,
            output: 0.0,
        }
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// Replace the gains
    ///
    /// Takes `&mut self`, so it can never interleave with a compute step.
    /// Accumulated integral is kept for a bumpless change.
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    pub fn policy(&self) -> OutputPolicy {
        self.policy
    }

    /// Output limits `(lo, hi)` for the configured policy
    pub fn limits(&self) -> (f32, f32) {
        match self.policy {
            OutputPolicy::Unipolar => (0.0, self.output_max),
            OutputPolicy::Bipolar => (-self.output_max, self.output_max),
        }
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Last computed output
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Run one control step
    pub fn compute(&mut self, target: f32, measured: f32) -> f32 {
        if target == 0.0 {
            self.reset();
            return 0.0;
        }
        self.mode = ControllerMode::Tracking;

        let error = target - measured;
        self.integral += error * self.dt_s;
        let derivative = (error - self.prev_error) / self.dt_s;
        self.prev_error = error;

        let (lo, hi) = self.limits();
        let raw = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        // NaN from a degenerate dt must not reach the actuator
        self.output = if raw.is_nan() { 0.0 } else { raw.clamp(lo, hi) };
        self.output
    }

    /// Return to idle: zero output, integral and error history cleared
    pub fn reset(&mut self) {
        self.mode = ControllerMode::Idle;
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.output = 0.0;
    }
}
