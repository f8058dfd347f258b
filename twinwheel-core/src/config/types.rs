//! Configuration type definitions
//!
//! The robot configuration is written as TOML, converted to postcard binary
//! at build time and decoded at boot. Every section has defaults so a
//! partial file is accepted.

use twinwheel_protocol::Gains;

use crate::control::{OutputPolicy, WHEELS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Structural configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A stage period was zero
    ZeroPeriod,
    /// Sampling must run at least as often as control
    SampleSlowerThanControl,
    /// Pulses per revolution was zero
    ZeroResolution,
}

/// Encoder and estimator settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncoderConfig {
    /// Pulses per wheel revolution (after gearing)
    pub pulses_per_rev: u16,
    /// EWMA smoothing factor, (0, 1]
    pub alpha: f32,
    /// Shortest accepted sampling window (µs)
    pub min_interval_us: u32,
    /// Per-wheel direction inversion (mirrored mounting)
    pub inverted: [bool; WHEELS],
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            pulses_per_rev: 440,
            alpha: 0.8,
            min_interval_us: 5_000,
            inverted: [false, true],
        }
    }
}

/// Velocity controller settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PidConfig {
    /// Gains in effect at boot
    pub gains: Gains,
    pub policy: OutputPolicy,
    /// Output magnitude limit (duty units)
    pub output_max: f32,
    /// Commanded targets are clamped to ±this (RPM)
    pub max_target_rpm: f32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            gains: Gains::new(0.5, 0.2, 0.1),
            policy: OutputPolicy::Unipolar,
            output_max: 255.0,
            max_target_rpm: 300.0,
        }
    }
}

/// H-bridge output settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActuatorConfig {
    /// Full-scale duty
    pub duty_max: u16,
    /// Short-brake instead of coasting on a zero command
    pub brake_on_zero: bool,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            duty_max: 255,
            brake_on_zero: false,
        }
    }
}

/// Stage periods (ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PeriodConfig {
    pub sample_ms: u32,
    pub control_ms: u32,
    pub telemetry_ms: u32,
    pub display_ms: u32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            sample_ms: 10,
            control_ms: 20,
            telemetry_ms: 100,
            display_ms: 200,
        }
    }
}

/// Complete robot configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RobotConfig {
    pub encoder: EncoderConfig,
    pub pid: PidConfig,
    pub actuator: ActuatorConfig,
    pub periods: PeriodConfig,
    pub timing: TimingConfig,
}

/// Lock and collaborator timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Longest wait for the shared state outside the control step (ms)
    pub lock_timeout_ms: u32,
    /// Minimum interval between attitude reads (ms)
    pub attitude_refresh_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2,
            attitude_refresh_ms: 10,
        }
    }
}

impl RobotConfig {
    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.periods;
        if p.sample_ms == 0 || p.control_ms == 0 || p.telemetry_ms == 0 || p.display_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if p.sample_ms > p.control_ms {
            return Err(ConfigError::SampleSlowerThanControl);
        }
        if self.encoder.pulses_per_rev == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        Ok(())
    }

    /// Clamp numeric settings into their usable ranges
    pub fn sanitized(mut self) -> Self {
        let enc = &mut self.encoder;
        if !(enc.alpha.is_finite() && enc.alpha > 0.0) {
            enc.alpha = 1.0;
        }
        enc.alpha = enc.alpha.min(1.0);

        let pid = &mut self.pid;
        for g in [&mut pid.gains.kp, &mut pid.gains.ki, &mut pid.gains.kd] {
            if !(g.is_finite() && *g >= 0.0) {
                *g = 0.0;
            }
        }
        self.actuator.duty_max = self.actuator.duty_max.clamp(1, i16::MAX as u16);
        let duty_max = self.actuator.duty_max as f32;
        if !(pid.output_max.is_finite() && pid.output_max > 0.0) {
            pid.output_max = duty_max;
        }
        pid.output_max = pid.output_max.min(duty_max);
        if !(pid.max_target_rpm.is_finite() && pid.max_target_rpm > 0.0) {
            pid.max_target_rpm = PidConfig::default().max_target_rpm;
        }
        self
    }

    /// Control period in seconds
    pub fn control_dt_s(&self) -> f32 {
        self.periods.control_ms as f32 / 1000.0
    }
}
