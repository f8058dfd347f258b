//! Stage scheduler
//!
//! Runs the periodic stages (sampling, control, telemetry, display) at
//! independent fixed periods on a single time base.

pub mod periodic;
pub mod stages;

pub use periodic::PeriodicTimer;
pub use stages::{DueStages, Stage, StageScheduler, STAGE_COUNT};
