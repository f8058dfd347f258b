//! H-bridge actuator channel
//!
//! Drives one motor through a PWM magnitude output and two direction lines,
//! with an optional standby line:
//!
//! | command        | IN1 | IN2 | PWM     |
//! |----------------|-----|-----|---------|
//! | duty > 0       | H   | L   | \|duty\| |
//! | duty < 0       | L   | H   | \|duty\| |
//! | stop, brake    | H   | H   | 0       |
//! | stop, coast    | L   | L   | 0       |
//!
//! Duty is given in `[-duty_max, duty_max]` and scaled to the PWM counter
//! range. Pin failures are latched in a fault flag instead of being returned;
//! the control loop keeps running either way.
//!
//! # Usage
//!
//! ```ignore
//! let mut left = HBridge::new(pwm, ain1, ain2, Some(stby), HBridgeConfig::default());
//! left.set_enabled(true);
//! left.set_command(120);   // forward
//! left.set_command(-60);   // reverse
//! left.stop(true);         // short-brake
//! ```

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use twinwheel_core::traits::{ActuatorCommand, ActuatorDriver};

/// H-bridge channel configuration
#[derive(Debug, Clone)]
pub struct HBridgeConfig {
    /// Full-scale duty (maps to 100% PWM)
    pub duty_max: u16,
    /// Short-brake instead of coasting when commanded zero
    pub brake_on_zero: bool,
    /// Swap the direction lines (motor wired reversed)
    pub inverted: bool,
}

impl Default for HBridgeConfig {
    fn default() -> Self {
        Self {
            duty_max: 255,
            brake_on_zero: false,
            inverted: false,
        }
    }
}

/// Placeholder for an absent standby line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// One H-bridge channel
pub struct HBridge<P, A, B, S = NoPin> {
    pwm: P,
    in1: A,
    in2: B,
    standby: Option<S>,
    config: HBridgeConfig,
    enabled: bool,
    last: ActuatorCommand,
    fault: bool,
}

impl<P, A, B, S> HBridge<P, A, B, S>
where
    P: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
    S: OutputPin,
{
    /// Create a channel; outputs start coasting and disabled
    pub fn new(pwm: P, in1: A, in2: B, standby: Option<S>, config: HBridgeConfig) -> Self {
        let mut bridge = Self {
            pwm,
            in1,
            in2,
            standby,
            config: HBridgeConfig {
                duty_max: config.duty_max.clamp(1, i16::MAX as u16),
                ..config
            },
            enabled: false,
            last: ActuatorCommand::COAST,
            fault: false,
        };
        bridge.write_lines(false, false, 0);
        bridge.write_standby(false);
        bridge
    }

    /// Map a duty magnitude to the PWM counter range
    fn scale(&self, magnitude: u16) -> u16 {
        let max = self.pwm.max_duty_cycle() as u32;
        (magnitude as u32 * max / self.config.duty_max as u32) as u16
    }

    fn write_lines(&mut self, in1: bool, in2: bool, pwm: u16) {
        // PWM first so the bridge never drives at the old duty in a new direction
        let ok = self.pwm.set_duty_cycle(0).is_ok()
            & self.in1.set_state(in1.into()).is_ok()
            & self.in2.set_state(in2.into()).is_ok()
            & self.pwm.set_duty_cycle(pwm).is_ok();
        if !ok {
            self.fault = true;
        }
    }

    fn write_standby(&mut self, active: bool) {
        if let Some(pin) = self.standby.as_mut() {
            // STBY high = bridge running
            if pin.set_state(active.into()).is_err() {
                self.fault = true;
            }
        }
    }
}

impl<P, A, B, S> ActuatorDriver for HBridge<P, A, B, S>
where
    P: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
    S: OutputPin,
{
    fn max_duty(&self) -> u16 {
        self.config.duty_max
    }

    fn set_command(&mut self, duty: i16) {
        if !self.enabled {
            return;
        }
        let max = self.config.duty_max as i16;
        let duty = duty.clamp(-max, max);
        if duty == 0 {
            self.stop(self.config.brake_on_zero);
            return;
        }

        let forward = (duty > 0) != self.config.inverted;
        let pwm = self.scale(duty.unsigned_abs());
        self.write_lines(forward, !forward, pwm);
        self.last = ActuatorCommand::drive(duty);
    }

    fn stop(&mut self, brake: bool) {
        self.write_lines(brake, brake, 0);
        self.last = ActuatorCommand { duty: 0, brake };
    }

    fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            // Coast the outputs; `last` is kept for reapply
            self.write_lines(false, false, 0);
        }
        self.enabled = enabled;
        self.write_standby(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn last_command(&self) -> ActuatorCommand {
        self.last
    }

    fn has_fault(&self) -> bool {
        self.fault
    }

    fn clear_fault(&mut self) {
        self.fault = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{self, ErrorKind};
    use embedded_hal::pwm;

    #[derive(Debug)]
    struct PinFault;

    impl digital::Error for PinFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    #[derive(Debug, Default)]
    struct MockPin {
        high: bool,
        broken: bool,
    }

    impl ErrorType for MockPin {
        type Error = PinFault;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), PinFault> {
            if self.broken {
                return Err(PinFault);
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), PinFault> {
            if self.broken {
                return Err(PinFault);
            }
            self.high = true;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct MockPwm {
        duty: u16,
        max: u16,
    }

    impl pwm::ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    type Bridge = HBridge<MockPwm, MockPin, MockPin, MockPin>;

    fn bridge(config: HBridgeConfig) -> Bridge {
        HBridge::new(
            MockPwm { duty: 0, max: 1000 },
            MockPin::default(),
            MockPin::default(),
            Some(MockPin::default()),
            config,
        )
    }

    fn lines(b: &Bridge) -> (bool, bool, u16) {
        (b.in1.high, b.in2.high, b.pwm.duty)
    }

    #[test]
    fn test_initial_state() {
        let b = bridge(HBridgeConfig::default());
        assert!(!b.is_enabled());
        assert_eq!(b.last_command(), ActuatorCommand::COAST);
        assert_eq!(lines(&b), (false, false, 0));
        assert!(!b.standby.as_ref().unwrap().high);
    }

    #[test]
    fn test_disabled_ignores_commands() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_command(100);
        assert_eq!(lines(&b), (false, false, 0));
        assert_eq!(b.last_command(), ActuatorCommand::COAST);
    }

    #[test]
    fn test_sign_selects_direction() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_enabled(true);
        assert!(b.standby.as_ref().unwrap().high);

        b.set_command(255);
        assert_eq!(lines(&b), (true, false, 1000));

        b.set_command(-51);
        assert_eq!(lines(&b), (false, true, 200));
        assert_eq!(b.last_command(), ActuatorCommand::drive(-51));
    }

    #[test]
    fn test_zero_stops_with_zero_pwm() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_enabled(true);
        b.set_command(100);
        b.set_command(0);
        assert_eq!(lines(&b), (false, false, 0));

        let mut b = bridge(HBridgeConfig {
            brake_on_zero: true,
            ..HBridgeConfig::default()
        });
        b.set_enabled(true);
        b.set_command(0);
        assert_eq!(lines(&b), (true, true, 0));
        assert_eq!(b.last_command(), ActuatorCommand::BRAKE);
    }

    #[test]
    fn test_brake_and_coast() {
        let mut b = bridge(HBridgeConfig::default());
        b.stop(true);
        assert_eq!(lines(&b), (true, true, 0));
        b.stop(false);
        assert_eq!(lines(&b), (false, false, 0));
    }

    #[test]
    fn test_out_of_range_clamped() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_enabled(true);
        b.set_command(i16::MIN);
        assert_eq!(b.last_command(), ActuatorCommand::drive(-255));
        assert_eq!(lines(&b), (false, true, 1000));
    }

    #[test]
    fn test_inverted_swaps_lines() {
        let mut b = bridge(HBridgeConfig {
            inverted: true,
            ..HBridgeConfig::default()
        });
        b.set_enabled(true);
        b.set_command(10);
        let (in1, in2, _) = lines(&b);
        assert!(!in1 && in2);
    }

    #[test]
    fn test_disable_coasts_and_reapply_restores() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_enabled(true);
        b.set_command(120);
        b.set_enabled(false);
        assert_eq!(lines(&b), (false, false, 0));
        assert!(!b.standby.as_ref().unwrap().high);
        assert_eq!(b.last_command(), ActuatorCommand::drive(120));

        // Still gated: nothing reaches the pins
        b.reapply();
        assert_eq!(lines(&b), (false, false, 0));

        b.set_enabled(true);
        b.reapply();
        assert_eq!(b.last_command(), ActuatorCommand::drive(120));
        // 120 / 255 of a 1000 counter
        assert_eq!(lines(&b), (true, false, 470));
    }

    #[test]
    fn test_pin_failure_sets_fault() {
        let mut b = bridge(HBridgeConfig::default());
        b.set_enabled(true);
        assert!(!b.has_fault());
        b.in2.broken = true;
        b.set_command(50);

        let actuator: &mut dyn ActuatorDriver = &mut b;
        assert!(actuator.has_fault());
        actuator.clear_fault();
        assert!(!actuator.has_fault());
    }
}
