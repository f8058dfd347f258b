//! Sampling and control task
//!
//! Runs the sample and control stages of the velocity loop from one
//! scheduler so that, within a control period, the sample always completes
//! before control reads it. Run gate changes from the start button are
//! applied between stages.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Output;
use embassy_rp::pwm::PwmOutput;
use embassy_time::{Instant, Timer};
use portable_atomic::Ordering;

use twinwheel_core::config::RobotConfig;
use twinwheel_core::control::{ControlError, VelocityLoop, WHEELS};
use twinwheel_core::encoder::{ChannelHandle, MAX_CHANNELS};
use twinwheel_core::scheduler::{Stage, StageScheduler};
use twinwheel_drivers::motor::HBridge;

use crate::channels::{Shared, RUNNING, RUN_ENABLE};

/// H-bridge channel as wired on the board
pub type Bridge = HBridge<PwmOutput<'static>, Output<'static>, Output<'static>, Output<'static>>;

/// Encoder channel paired with the bridge of the same wheel
pub type WheelChannel = (ChannelHandle<'static, MAX_CHANNELS>, Bridge);

#[embassy_executor::task]
pub async fn control_task(channels: [WheelChannel; WHEELS], config: RobotConfig, shared: &'static Shared) {
    info!(
        "Control task started: sample {} ms, control {} ms",
        config.periods.sample_ms, config.periods.control_ms
    );

    let start_us = Instant::now().as_micros();
    let mut velocity = VelocityLoop::new(channels, &config, start_us);
    let mut scheduler = StageScheduler::new(&config.periods, &[Stage::Sample, Stage::Control], start_us);
    let mut reported_skips = 0;
    let mut reported_overruns = 0;
    let mut faulted = [false; WHEELS];

    loop {
        let deadline = scheduler
            .next_deadline_us()
            .unwrap_or(Instant::now().as_micros() + config.periods.sample_ms as u64 * 1_000);

        if let Either::Second(enabled) =
            select(Timer::at(Instant::from_micros(deadline)), RUN_ENABLE.wait()).await
        {
            velocity.set_enabled(enabled);
            RUNNING.store(enabled, Ordering::Release);
            debug!("Run gate {}", if enabled { "opened" } else { "closed" });
            continue;
        }

        let now = Instant::now();
        for stage in scheduler.poll(now.as_micros()) {
            match stage {
                Stage::Sample => {
                    if let Err(e) = velocity.sample(now.as_micros()) {
                        trace!("Sample deferred: {:?}", e);
                    }
                }
                Stage::Control => match velocity.control(shared, now.as_millis() as u32) {
                    Ok(command) => trace!("Duty {} brake={}", command.duty, command.brake),
                    Err(ControlError::NoSample) => trace!("Control waiting for first sample"),
                    Err(ControlError::Contended) => {}
                },
                Stage::Telemetry | Stage::Display => {}
            }
        }

        let skipped = velocity.skipped_cycles();
        if skipped != reported_skips {
            warn!("Control cycle skipped on lock contention ({} total)", skipped);
            reported_skips = skipped;
        }
        for (wheel, (fault, seen)) in velocity.take_faults().into_iter().zip(faulted.iter_mut()).enumerate() {
            if fault && !*seen {
                warn!("H-bridge {} output write failed", wheel);
            }
            *seen = fault;
        }
        let overruns = scheduler.overruns(Stage::Control);
        if overruns != reported_overruns {
            warn!("Control stage overran ({} periods total)", overruns);
            reported_overruns = overruns;
        }
    }
}
