//! Outbound telemetry
//!
//! Two formats are produced:
//! - a structured record per telemetry period,
//!   `{"type":"data","timestamp":1200,"target_rpm":100.0,...}`
//! - scalar plotter lines, one value per line: `>current_rpm:98.50`

use core::fmt::{self, Write};

use heapless::String;
use serde::Serialize;

use crate::command::Gains;

/// Maximum encoded record length (including the trailing newline)
pub const MAX_RECORD_LEN: usize = 256;

/// An encoded telemetry record line
pub type RecordLine = String<MAX_RECORD_LEN>;

/// One telemetry sample as sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "type")]
    kind: &'static str,
    /// Milliseconds since boot when the control step ran
    pub timestamp: u32,
    /// Target velocity (RPM)
    pub target_rpm: f32,
    /// Measured velocity (RPM)
    pub current_rpm: f32,
    /// Tracking error (RPM)
    pub error: f32,
    /// Controller output (duty units)
    pub motor_output: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl TelemetryRecord {
    /// Build a record
    pub fn new(
        timestamp: u32,
        target_rpm: f32,
        current_rpm: f32,
        motor_output: f32,
        gains: Gains,
    ) -> Self {
        Self {
            kind: "data",
            timestamp,
            target_rpm,
            current_rpm,
            error: target_rpm - current_rpm,
            motor_output,
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
        }
    }
}

/// Encode a record as a newline-terminated JSON line
///
/// Returns `None` if the record does not fit, which cannot happen for
/// finite values.
pub fn encode_record(record: &TelemetryRecord) -> Option<RecordLine> {
    let json = serde_json_core::to_string::<_, MAX_RECORD_LEN>(record).ok()?;
    let mut line = RecordLine::new();
    line.push_str(&json).ok()?;
    line.push('\n').ok()?;
    Some(line)
}

/// Write one `>name:value` plotter line
pub fn write_plot_line<W: Write>(out: &mut W, name: &str, value: f32) -> fmt::Result {
    writeln!(out, ">{}:{:.2}", name, value)
}

/// Write one `>name:value` plotter line for an integer channel
pub fn write_plot_int<W: Write>(out: &mut W, name: &str, value: i32) -> fmt::Result {
    writeln!(out, ">{}:{}", name, value)
}
