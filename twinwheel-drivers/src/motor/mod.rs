//! Motor driver implementations
//!
//! - H-bridge: PWM magnitude plus two direction lines and an optional
//!   standby line (TB6612FNG, DRV8833 in PWM/IN mode, L298N)

pub mod hbridge;

pub use hbridge::{HBridge, HBridgeConfig, NoPin};
