//! Velocity loop
//!
//! Owns the consumer side of the encoder channels, one estimator per wheel,
//! the PID controller and the actuators. Two entry points are driven by the
//! scheduler:
//!
//! - [`VelocityLoop::sample`]: exactly one read-and-reset per channel and
//!   window, then estimation
//! - [`VelocityLoop::control`]: under the shared lock read the setpoint,
//!   compute and publish telemetry; actuators are written after the lock is
//!   released
//!
//! The loop's measurement is the mean of the wheel estimates and the same
//! duty drives every wheel.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::pid::{OutputPolicy, VelocityController};
use super::shared::{SharedControl, TelemetrySnapshot, WheelTelemetry};
use super::WHEELS;
use crate::config::RobotConfig;
use crate::encoder::{ChannelHandle, EstimateError, VelocityEstimate, VelocityEstimator};
use crate::traits::{ActuatorCommand, ActuatorDriver};

/// Reasons a control step did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// No sampling window has completed yet
    NoSample,
    /// Shared state was locked; the previous output stays applied
    Contended,
}

struct Wheel<'r, A, const N: usize> {
    channel: ChannelHandle<'r, N>,
    estimator: VelocityEstimator,
    actuator: A,
}

/// Sampling and control for all wheels
pub struct VelocityLoop<'r, A, const N: usize> {
    wheels: [Wheel<'r, A, N>; WHEELS],
    controller: VelocityController,
    pulses_per_rev: u16,
    duty_max: u16,
    brake_on_zero: bool,
    window_start_us: u64,
    sampled: bool,
    enabled: bool,
    skipped_cycles: u32,
    command: ActuatorCommand,
}

impl<'r, A: ActuatorDriver, const N: usize> VelocityLoop<'r, A, N> {
    /// Build the loop from registered channels and their actuators
    ///
    /// The first sampling window starts at `start_us`. Actuators start
    /// disabled; see [`VelocityLoop::set_enabled`].
    pub fn new(channels: [(ChannelHandle<'r, N>, A); WHEELS], config: &RobotConfig, start_us: u64) -> Self {
        let mut wheel = 0;
        let wheels = channels.map(|(channel, mut actuator)| {
            let inverted = config.encoder.inverted[wheel];
            wheel += 1;
            actuator.set_enabled(false);
            Wheel {
                channel,
                estimator: VelocityEstimator::new(
                    config.encoder.alpha,
                    inverted,
                    config.encoder.min_interval_us,
                ),
                actuator,
            }
        });

        Self {
            wheels,
            controller: VelocityController::new(
                config.pid.gains,
                config.pid.policy,
                config.pid.output_max,
                config.control_dt_s(),
            ),
            pulses_per_rev: config.encoder.pulses_per_rev,
            duty_max: config.actuator.duty_max,
            brake_on_zero: config.actuator.brake_on_zero,
            window_start_us: start_us,
            sampled: false,
            enabled: false,
            skipped_cycles: 0,
            command: ActuatorCommand::COAST,
        }
    }

    /// Close the current window and update the estimates
    ///
    /// A window shorter than the estimator minimum is rejected without
    /// touching the counters; its pulses roll into the next window.
    pub fn sample(&mut self, now_us: u64) -> Result<[VelocityEstimate; WHEELS], EstimateError> {
        if self.pulses_per_rev == 0 {
            return Err(EstimateError::InvalidResolution);
        }
        let elapsed_us = u32::try_from(now_us.saturating_sub(self.window_start_us)).unwrap_or(u32::MAX);
        if !self.wheels.iter().all(|w| w.estimator.accepts(elapsed_us)) {
            return Err(EstimateError::IntervalTooShort);
        }

        let mut estimates = [VelocityEstimate::default(); WHEELS];
        for (wheel, slot) in self.wheels.iter_mut().zip(estimates.iter_mut()) {
            let pulses = wheel.channel.reset_and_read();
            *slot = wheel.estimator.sample(pulses, elapsed_us, self.pulses_per_rev)?;
        }

        self.window_start_us = now_us;
        self.sampled = true;
        Ok(estimates)
    }

    /// Run one control step
    ///
    /// Never waits for the lock: on contention the cycle is skipped and
    /// counted.
    pub fn control<M: RawMutex>(
        &mut self,
        shared: &SharedControl<M>,
        now_ms: u32,
    ) -> Result<ActuatorCommand, ControlError> {
        if !self.sampled {
            return Err(ControlError::NoSample);
        }
        let Ok(mut state) = shared.try_lock() else {
            self.skipped_cycles = self.skipped_cycles.wrapping_add(1);
            return Err(ControlError::Contended);
        };

        let setpoint = state.setpoint();
        if setpoint.gains != self.controller.gains() {
            self.controller.set_gains(setpoint.gains);
        }
        let target = setpoint.target_rpm;
        let estimates = self.estimates();

        let (measured, output) = match self.controller.policy() {
            OutputPolicy::Unipolar => {
                // Speed along the target's direction; wheels turning the
                // other way count as negative progress
                let velocity = mean(estimates.map(|e| e.signed_rpm()));
                let along = if target < 0.0 { -velocity } else { velocity };
                let drive = self.controller.compute(magnitude(target), along);
                (velocity, if target < 0.0 { -drive } else { drive })
            }
            OutputPolicy::Bipolar => {
                let velocity = mean(estimates.map(|e| e.signed_rpm()));
                (velocity, self.controller.compute(target, velocity))
            }
        };

        let (output, command) = if self.enabled {
            (
                output,
                ActuatorCommand::from_output(output, self.duty_max, self.brake_on_zero),
            )
        } else {
            self.controller.reset();
            (0.0, ActuatorCommand::COAST)
        };

        let mut wheels = [WheelTelemetry::default(); WHEELS];
        for (slot, estimate) in wheels.iter_mut().zip(estimates.iter()) {
            *slot = WheelTelemetry {
                rpm: estimate.filtered_rpm,
                direction: estimate.direction,
                duty: command.duty,
            };
        }
        state.publish(TelemetrySnapshot {
            timestamp_ms: now_ms,
            target_rpm: target,
            measured_rpm: measured,
            output,
            gains: setpoint.gains,
            wheels,
            skipped_cycles: self.skipped_cycles,
        });
        drop(state);

        if self.enabled {
            for wheel in self.wheels.iter_mut() {
                wheel.actuator.apply(command);
            }
        }
        self.command = command;
        Ok(command)
    }

    /// Gate the actuators
    ///
    /// Disabling stops every wheel and returns the controller to idle;
    /// enabling re-applies the last command.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        for wheel in self.wheels.iter_mut() {
            wheel.actuator.set_enabled(enabled);
        }
        if enabled {
            for wheel in self.wheels.iter_mut() {
                wheel.actuator.reapply();
            }
        } else {
            self.controller.reset();
            self.command = ActuatorCommand::COAST;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Latest estimate per wheel
    pub fn estimates(&self) -> [VelocityEstimate; WHEELS] {
        let mut out = [VelocityEstimate::default(); WHEELS];
        for (slot, wheel) in out.iter_mut().zip(self.wheels.iter()) {
            *slot = wheel.estimator.estimate();
        }
        out
    }

    /// Read and clear the actuator fault flags, one per wheel
    ///
    /// A wheel whose outputs keep failing reports again on every call.
    pub fn take_faults(&mut self) -> [bool; WHEELS] {
        let mut faults = [false; WHEELS];
        for (slot, wheel) in faults.iter_mut().zip(self.wheels.iter_mut()) {
            *slot = wheel.actuator.has_fault();
            wheel.actuator.clear_fault();
        }
        faults
    }

    /// Command applied by the last control step
    pub fn command(&self) -> ActuatorCommand {
        self.command
    }

    /// Control steps skipped on lock contention
    pub fn skipped_cycles(&self) -> u32 {
        self.skipped_cycles
    }

    /// Stop all wheels, release the encoder channels and hand back the
    /// actuators
    pub fn shutdown(self) -> [A; WHEELS] {
        let brake = self.brake_on_zero;
        self.wheels.map(|mut wheel| {
            wheel.actuator.stop(brake);
            wheel.actuator.set_enabled(false);
            wheel.channel.unregister();
            wheel.actuator
        })
    }
}

fn mean(values: [f32; WHEELS]) -> f32 {
    values.iter().sum::<f32>() / WHEELS as f32
}

fn magnitude(value: f32) -> f32 {
    if value < 0.0 {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{ChannelRegistry, Direction};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use twinwheel_protocol::{Command, Gains};

    type Shared = SharedControl<CriticalSectionRawMutex>;

    #[derive(Debug, Default)]
    struct MockActuator {
        enabled: bool,
        last: ActuatorCommand,
        writes: u32,
        broken: bool,
        fault: bool,
    }

    impl ActuatorDriver for MockActuator {
        fn max_duty(&self) -> u16 {
            255
        }

        fn set_command(&mut self, duty: i16) {
            if self.enabled {
                self.last = ActuatorCommand::drive(duty.clamp(-255, 255));
                self.writes += 1;
                self.fault |= self.broken;
            }
        }

        fn stop(&mut self, brake: bool) {
            self.last = ActuatorCommand { duty: 0, brake };
            self.writes += 1;
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
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

    /// Simulated encoder lines for one channel
    struct Lines {
        index: usize,
        phase: usize,
    }

    impl Lines {
        const LEVELS: [(bool, bool); 4] = [(false, false), (true, false), (true, true), (false, true)];

        fn new(index: usize) -> Self {
            Self { index, phase: 0 }
        }

        fn spin<const N: usize>(&mut self, registry: &ChannelRegistry<N>, steps: i32) {
            for _ in 0..steps.unsigned_abs() {
                self.phase = if steps > 0 { (self.phase + 1) % 4 } else { (self.phase + 3) % 4 };
                let (a, b) = Self::LEVELS[self.phase];
                registry.dispatch(self.index, a, b);
            }
        }
    }

    fn config() -> RobotConfig {
        let mut config = RobotConfig::default();
        config.pid.gains = Gains::new(1.0, 0.0, 0.0);
        config
    }

    fn build<'r>(registry: &'r ChannelRegistry<2>, config: &RobotConfig) -> VelocityLoop<'r, MockActuator, 2> {
        let channels = [
            (registry.register(0, false, false).unwrap(), MockActuator::default()),
            (registry.register(1, false, false).unwrap(), MockActuator::default()),
        ];
        VelocityLoop::new(channels, config, 0)
    }

    fn shared(config: &RobotConfig) -> Shared {
        SharedControl::new(config.pid.gains, config.pid.max_target_rpm)
    }

    #[test]
    fn test_control_waits_for_first_sample() {
        let registry = ChannelRegistry::new();
        let config = config();
        let mut vloop = build(&registry, &config);
        assert_eq!(vloop.control(&shared(&config), 0), Err(ControlError::NoSample));
    }

    #[test]
    fn test_short_window_keeps_pulses() {
        let registry = ChannelRegistry::new();
        let config = config();
        let mut vloop = build(&registry, &config);
        let mut left = Lines::new(0);

        left.spin(&registry, 11);
        assert_eq!(vloop.sample(1_000), Err(EstimateError::IntervalTooShort));

        // 11 pulses over the full 10 ms window at 440 ppr = 150 RPM
        let estimates = vloop.sample(10_000).unwrap();
        assert!((estimates[0].raw_rpm - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_control_step_drives_both_wheels() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);
        let (mut left, mut right) = (Lines::new(0), Lines::new(1));

        shared.try_apply(Command::SetTarget(200.0)).unwrap();
        vloop.set_enabled(true);

        // Right encoder is mounted mirrored: negative count is forward
        left.spin(&registry, 11);
        right.spin(&registry, -11);
        let estimates = vloop.sample(10_000).unwrap();
        assert_eq!(estimates[0].direction, Direction::Forward);
        assert_eq!(estimates[1].direction, Direction::Forward);

        // filtered = 0.8 * 150 = 120, error = 80, Kp = 1
        let command = vloop.control(&shared, 20).unwrap();
        assert_eq!(command, ActuatorCommand::drive(80));

        let snap = shared.try_snapshot().unwrap();
        assert_eq!(snap.timestamp_ms, 20);
        assert!((snap.measured_rpm - 120.0).abs() < 1e-3);
        assert!((snap.error() - 80.0).abs() < 1e-3);
        assert_eq!(snap.wheels[1].duty, 80);

        let actuators = vloop.shutdown();
        assert_eq!(actuators[0].last_command(), ActuatorCommand::COAST);
        assert!(!actuators[0].is_enabled());
        assert!(!registry.is_registered(0));
        assert!(!registry.is_registered(1));
    }

    #[test]
    fn test_negative_target_reverses_unipolar_output() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);

        shared.try_apply(Command::SetTarget(-50.0)).unwrap();
        vloop.set_enabled(true);
        vloop.sample(10_000).unwrap();

        assert_eq!(vloop.control(&shared, 20).unwrap(), ActuatorCommand::drive(-50));
    }

    #[test]
    fn test_unipolar_counts_reverse_motion_against_target() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);
        let (mut left, mut right) = (Lines::new(0), Lines::new(1));

        shared.try_apply(Command::SetTarget(100.0)).unwrap();
        vloop.set_enabled(true);

        // Rolling backward at 120 RPM while asked for +100
        left.spin(&registry, -11);
        right.spin(&registry, 11);
        let estimates = vloop.sample(10_000).unwrap();
        assert_eq!(estimates[0].direction, Direction::Backward);
        assert_eq!(estimates[1].direction, Direction::Backward);

        // error = 100 - (-120) = 220
        assert_eq!(vloop.control(&shared, 20).unwrap(), ActuatorCommand::drive(220));

        let snap = shared.try_snapshot().unwrap();
        assert!((snap.measured_rpm + 120.0).abs() < 1e-3);
        assert!((snap.error() - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_contention_skips_and_holds_output() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);

        shared.try_apply(Command::SetTarget(100.0)).unwrap();
        vloop.set_enabled(true);
        vloop.sample(10_000).unwrap();
        let applied = vloop.control(&shared, 20).unwrap();

        let guard = shared.try_lock().unwrap();
        assert_eq!(vloop.control(&shared, 40), Err(ControlError::Contended));
        drop(guard);

        assert_eq!(vloop.skipped_cycles(), 1);
        assert_eq!(vloop.command(), applied);
        assert_eq!(vloop.wheels[0].actuator.last_command(), applied);

        vloop.control(&shared, 60).unwrap();
        assert_eq!(shared.try_snapshot().unwrap().skipped_cycles, 1);
    }

    #[test]
    fn test_disabled_loop_publishes_zero_output() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);

        shared.try_apply(Command::SetTarget(100.0)).unwrap();
        vloop.sample(10_000).unwrap();

        assert_eq!(vloop.control(&shared, 20).unwrap(), ActuatorCommand::COAST);
        assert_eq!(shared.try_snapshot().unwrap().output, 0.0);
        assert_eq!(vloop.wheels[0].actuator.writes, 0);
    }

    #[test]
    fn test_reenable_restores_last_drive() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);

        shared.try_apply(Command::SetTarget(80.0)).unwrap();
        vloop.set_enabled(true);
        vloop.sample(10_000).unwrap();
        assert_eq!(vloop.control(&shared, 20).unwrap(), ActuatorCommand::drive(80));
        let writes = vloop.wheels[0].actuator.writes;

        vloop.set_enabled(false);
        assert!(!vloop.wheels[0].actuator.is_enabled());
        assert_eq!(vloop.command(), ActuatorCommand::COAST);

        vloop.set_enabled(true);
        assert_eq!(vloop.wheels[0].actuator.writes, writes + 1);
        assert_eq!(vloop.wheels[1].actuator.last_command(), ActuatorCommand::drive(80));
    }

    #[test]
    fn test_actuator_faults_reported_and_cleared() {
        let registry = ChannelRegistry::new();
        let config = config();
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);

        shared.try_apply(Command::SetTarget(80.0)).unwrap();
        vloop.set_enabled(true);
        vloop.sample(10_000).unwrap();
        vloop.wheels[1].actuator.broken = true;
        vloop.control(&shared, 20).unwrap();

        assert_eq!(vloop.take_faults(), [false, true]);
        assert_eq!(vloop.take_faults(), [false, false]);

        vloop.control(&shared, 40).unwrap();
        assert_eq!(vloop.take_faults(), [false, true]);
    }

    #[test]
    fn test_bipolar_brakes_overspeed() {
        let registry = ChannelRegistry::new();
        let mut config = config();
        config.pid.policy = crate::control::OutputPolicy::Bipolar;
        let shared = shared(&config);
        let mut vloop = build(&registry, &config);
        let mut left = Lines::new(0);
        let mut right = Lines::new(1);

        shared.try_apply(Command::SetTarget(50.0)).unwrap();
        vloop.set_enabled(true);
        left.spin(&registry, 11);
        right.spin(&registry, -11);
        vloop.sample(10_000).unwrap();

        // measured 120 against target 50
        assert_eq!(vloop.control(&shared, 20).unwrap(), ActuatorCommand::drive(-70));
    }
}
