//! Board-agnostic velocity control core for the two-wheel robot
//!
//! This crate contains all control logic that does not depend on
//! specific hardware implementations:
//!
//! - Quadrature decoding and the interrupt channel registry
//! - Velocity estimation (RPM + direction, low-pass filtered)
//! - PID velocity controller and the shared control state
//! - Stage scheduler (sampling, control, telemetry, display periods)
//! - Display pages and collaborator traits (actuator, attitude, display)
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod display;
pub mod encoder;
pub mod scheduler;
pub mod traits;
