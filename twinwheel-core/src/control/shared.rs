//! Shared control state
//!
//! One mutex guards the setpoint (target, gains) and the latest telemetry
//! snapshot. The command handler writes the setpoint, the control step reads
//! the setpoint and publishes telemetry, the telemetry and display stages
//! read snapshots. Every critical section is a short read/modify/write; no
//! I/O is done while the guard is held.
//!
//! Non-blocking `try_*` variants are for the control step, which skips the
//! cycle on contention. Async variants are for tasks that wait; callers wrap
//! them in a timeout.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use twinwheel_protocol::{Command, Gains, Response};

use super::WHEELS;
use crate::encoder::Direction;

/// Lock was held by another stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contended;

/// Rejected command; the setpoint is unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// A gain was negative, NaN or infinite
    InvalidGains,
    /// Target was NaN or infinite
    InvalidTarget,
}

impl CommandError {
    pub fn message(&self) -> &'static str {
        match self {
            CommandError::InvalidGains => "gains must be finite and non-negative",
            CommandError::InvalidTarget => "target must be finite",
        }
    }
}

/// Operator-controlled inputs of the loop
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Setpoint {
    /// Target velocity (RPM, signed)
    pub target_rpm: f32,
    pub gains: Gains,
}

/// Per-wheel part of a telemetry snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelTelemetry {
    /// Filtered speed magnitude (RPM)
    pub rpm: f32,
    pub direction: Direction,
    /// Duty applied to this wheel
    pub duty: i16,
}

/// Consistent view of the loop after one control step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    /// Milliseconds since boot when the step ran
    pub timestamp_ms: u32,
    pub target_rpm: f32,
    /// Value fed to the controller as the measurement (RPM)
    pub measured_rpm: f32,
    /// Controller output (duty units, signed)
    pub output: f32,
    pub gains: Gains,
    pub wheels: [WheelTelemetry; WHEELS],
    /// Control cycles skipped because the lock was held
    pub skipped_cycles: u32,
}

impl TelemetrySnapshot {
    /// Tracking error (RPM)
    pub fn error(&self) -> f32 {
        self.target_rpm - self.measured_rpm
    }
}

/// State behind the lock
#[derive(Debug, Clone)]
pub struct ControlShared {
    setpoint: Setpoint,
    max_target_rpm: f32,
    telemetry: TelemetrySnapshot,
}

impl ControlShared {
    pub const fn new(gains: Gains, max_target_rpm: f32) -> Self {
        Self {
            setpoint: Setpoint {
                target_rpm: 0.0,
                gains,
            },
            max_target_rpm,
            telemetry: TelemetrySnapshot {
                timestamp_ms: 0,
                target_rpm: 0.0,
                measured_rpm: 0.0,
                output: 0.0,
                gains,
                wheels: [WheelTelemetry {
                    rpm: 0.0,
                    direction: Direction::Stopped,
                    duty: 0,
                }; WHEELS],
                skipped_cycles: 0,
            },
        }
    }

    pub fn setpoint(&self) -> Setpoint {
        self.setpoint
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry
    }

    /// Store the result of a control step
    pub fn publish(&mut self, telemetry: TelemetrySnapshot) {
        self.telemetry = telemetry;
    }

    /// Validate and apply a command
    ///
    /// Targets beyond the configured maximum are clamped, not rejected.
    pub fn apply(&mut self, command: Command) -> Result<&'static str, CommandError> {
        match command {
            Command::SetGains(gains) => {
                if !gains.is_valid() {
                    return Err(CommandError::InvalidGains);
                }
                self.setpoint.gains = gains;
                Ok("PID parameters updated")
            }
            Command::SetTarget(rpm) => {
                if !rpm.is_finite() {
                    return Err(CommandError::InvalidTarget);
                }
                let max = self.max_target_rpm;
                let clamped = rpm.clamp(-max, max);
                self.setpoint.target_rpm = clamped;
                if clamped == rpm {
                    Ok("target RPM updated")
                } else {
                    Ok("target RPM clamped")
                }
            }
        }
    }

    /// Apply a command and build its acknowledgment
    pub fn respond(&mut self, command: Command) -> Response {
        match self.apply(command) {
            Ok(msg) => Response::Success(msg),
            Err(e) => Response::Error(e.message()),
        }
    }
}

/// Mutex-guarded [`ControlShared`]
pub struct SharedControl<M: RawMutex> {
    inner: Mutex<M, ControlShared>,
}

impl<M: RawMutex> SharedControl<M> {
    pub const fn new(gains: Gains, max_target_rpm: f32) -> Self {
        Self {
            inner: Mutex::new(ControlShared::new(gains, max_target_rpm)),
        }
    }

    /// Take the lock without waiting
    pub fn try_lock(&self) -> Result<MutexGuard<'_, M, ControlShared>, Contended> {
        self.inner.try_lock().map_err(|_| Contended)
    }

    /// Wait for the lock
    pub async fn lock(&self) -> MutexGuard<'_, M, ControlShared> {
        self.inner.lock().await
    }

    pub fn try_apply(&self, command: Command) -> Result<Response, Contended> {
        Ok(self.try_lock()?.respond(command))
    }

    pub fn try_snapshot(&self) -> Result<TelemetrySnapshot, Contended> {
        Ok(self.try_lock()?.telemetry())
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().await.telemetry()
    }

    pub fn try_setpoint(&self) -> Result<Setpoint, Contended> {
        Ok(self.try_lock()?.setpoint())
    }
}
