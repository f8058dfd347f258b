//! Velocity control
//!
//! - [`inbox`]: ordered serial input with a pending slot for contended
//!   commands
//! - [`pid`]: the PID controller
//! - [`shared`]: setpoint and telemetry behind one mutex
//! - [`velocity_loop`]: sampling and control steps tying encoders, estimator,
//!   controller and actuators together

pub mod inbox;
pub mod pid;
pub mod shared;
pub mod velocity_loop;

pub use inbox::{CommandInbox, InboxStep, Inbound};
pub use pid::{ControllerMode, OutputPolicy, VelocityController};
pub use shared::{
    CommandError, Contended, ControlShared, Setpoint, SharedControl, TelemetrySnapshot,
    WheelTelemetry,
};
pub use velocity_loop::{ControlError, VelocityLoop};

/// Wheels driven by the loop
pub const WHEELS: usize = 2;
