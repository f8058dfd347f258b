//! Wheel encoder handling
//!
//! - [`quadrature`]: interrupt-side Gray-code decoding into an atomic counter
//! - [`registry`]: fixed-capacity table routing edge interrupts to channels
//! - [`velocity`]: pulse windows to filtered RPM and direction

pub mod quadrature;
pub mod registry;
pub mod velocity;

pub use quadrature::QuadratureDecoder;
pub use registry::{ChannelHandle, ChannelRegistry, RegistryError, MAX_CHANNELS};
pub use velocity::{Direction, EstimateError, VelocityEstimate, VelocityEstimator};
