//! Configuration loading
//!
//! `build.rs` validates `robot.toml` and embeds it as postcard bytes. The
//! image is decoded once at boot; a decode or validation failure falls back
//! to the built-in defaults so the robot still comes up.

use defmt::*;

use twinwheel_core::config::RobotConfig;

/// Postcard image of robot.toml produced by the build script
static EMBEDDED_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/robot_config.bin"));

/// Decode, validate and sanitize the embedded configuration
pub fn load() -> RobotConfig {
    let config = match postcard::from_bytes::<RobotConfig>(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            warn!("Embedded config unreadable ({}), using defaults", Debug2Format(&e));
            return RobotConfig::default();
        }
    };

    if let Err(e) = config.validate() {
        warn!("Embedded config rejected: {:?}, using defaults", e);
        return RobotConfig::default();
    }

    let config = config.sanitized();
    info!(
        "Config: {} ppr, alpha={}, periods {}/{}/{}/{} ms",
        config.encoder.pulses_per_rev,
        config.encoder.alpha,
        config.periods.sample_ms,
        config.periods.control_ms,
        config.periods.telemetry_ms,
        config.periods.display_ms
    );
    config
}
