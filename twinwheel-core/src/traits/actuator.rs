//! Actuator driver trait
//!
//! An actuator is one H-bridge channel: two direction lines plus a PWM
//! magnitude. Commands are signed duties; the sign selects the direction
//! lines, the magnitude goes to PWM.

/// Signed duty plus braking flag
///
/// `duty == 0` means stopped; `brake` then selects short-brake (both
/// direction lines asserted) over coast (both released).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    pub duty: i16,
    pub brake: bool,
}

impl ActuatorCommand {
    /// Coast to a stop
    pub const COAST: Self = Self {
        duty: 0,
        brake: false,
    };

    /// Short-brake
    pub const BRAKE: Self = Self {
        duty: 0,
        brake: true,
    };

    /// Drive at a signed duty
    pub const fn drive(duty: i16) -> Self {
        Self { duty, brake: false }
    }

    /// Convert a controller output to a command
    ///
    /// The output is rounded to the nearest duty step and clamped to
    /// `[-max_duty, max_duty]`. NaN maps to a stop.
    pub fn from_output(output: f32, max_duty: u16, brake_on_zero: bool) -> Self {
        let max = max_duty.min(i16::MAX as u16) as f32;
        if output.is_nan() {
            return Self {
                duty: 0,
                brake: brake_on_zero,
            };
        }
        let clamped = output.clamp(-max, max);
        // Round half away from zero without libm
        let rounded = if clamped >= 0.0 {
            (clamped + 0.5) as i16
        } else {
            (clamped - 0.5) as i16
        };
        Self {
            duty: rounded,
            brake: rounded == 0 && brake_on_zero,
        }
    }

    /// Check if this command stops the actuator
    pub fn is_stop(&self) -> bool {
        self.duty == 0
    }
}

/// Trait for one H-bridge actuator channel
///
/// Implementations never fail: out-of-range duties are clamped and a
/// disabled actuator ignores commands and holds its outputs stopped.
pub trait ActuatorDriver {
    /// Largest duty magnitude accepted
    fn max_duty(&self) -> u16;

    /// Apply a signed duty
    ///
    /// Positive drives forward, negative drives in reverse, zero stops using
    /// the driver's configured zero behavior.
    fn set_command(&mut self, duty: i16);

    /// Stop with zero PWM; `brake` asserts both direction lines
    fn stop(&mut self, brake: bool);

    /// Gate command application
    fn set_enabled(&mut self, enabled: bool);

    /// Check if commands are being applied
    fn is_enabled(&self) -> bool;

    /// Last command requested (after clamping)
    ///
    /// Disabling stops the outputs but keeps this value, so re-enabling can
    /// restore it.
    fn last_command(&self) -> ActuatorCommand;

    /// Check if an output write has failed since the last
    /// [`ActuatorDriver::clear_fault`]
    fn has_fault(&self) -> bool {
        false
    }

    fn clear_fault(&mut self) {}

    /// Apply a full command
    fn apply(&mut self, command: ActuatorCommand) {
        if command.is_stop() {
            self.stop(command.brake);
        } else {
            self.set_command(command.duty);
        }
    }

    /// Re-apply the last command, e.g. after the stage was re-enabled
    fn reapply(&mut self) {
        let command = self.last_command();
        self.apply(command);
    }
}
