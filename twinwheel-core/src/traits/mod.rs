//! Hardware abstraction traits
//!
//! These traits define the interface between the control core and the
//! board-specific collaborators (H-bridge outputs, attitude sensor, display).

pub mod actuator;
pub mod attitude;
pub mod display;

pub use actuator::{ActuatorCommand, ActuatorDriver};
pub use attitude::{AbsentSensor, Attitude, AttitudeCache, AttitudeSensor, SensorError};
pub use display::{DisplayError, TelemetrySink, TelemetrySinkExt, MAX_DATA_LINES};
