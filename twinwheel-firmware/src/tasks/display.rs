//! Display refresh task
//!
//! Read-only view of the loop: takes a telemetry snapshot (bounded wait),
//! refreshes the attitude cache and renders the active page. While the run
//! gate is closed the start prompt is shown instead.

use defmt::*;
use embassy_time::{with_timeout, Duration, Instant, Ticker};
use portable_atomic::Ordering;

use twinwheel_core::config::RobotConfig;
use twinwheel_core::control::TelemetrySnapshot;
use twinwheel_core::display::{PageContext, PageSet, Screen};
use twinwheel_core::traits::{AbsentSensor, AttitudeCache, TelemetrySink, TelemetrySinkExt};

use crate::channels::{Shared, PAGE_INPUT, RUNNING};
use crate::display::LogDisplay;

#[embassy_executor::task]
pub async fn display_task(config: RobotConfig, shared: &'static Shared) {
    info!("Display task started: every {} ms", config.periods.display_ms);

    let lock_timeout = Duration::from_millis(config.timing.lock_timeout_ms as u64);
    let mut ticker = Ticker::every(Duration::from_millis(config.periods.display_ms as u64));
    let mut sink = LogDisplay::new();
    let mut pages = PageSet::new();
    let mut screen = Screen::new();
    let mut attitude = AttitudeCache::new(AbsentSensor, config.timing.attitude_refresh_ms);
    let mut telemetry = TelemetrySnapshot::default();
    let mut sensor_reported = false;

    loop {
        ticker.next().await;

        while let Ok(input) = PAGE_INPUT.try_receive() {
            pages.on_input(input);
            debug!("Page input {:?}, showing {}", input, pages.active().title());
        }

        // Keep the previous snapshot if the lock is busy
        if let Ok(snapshot) = with_timeout(lock_timeout, shared.snapshot()).await {
            telemetry = snapshot;
        }

        let now_ms = Instant::now().as_millis() as u32;
        let ctx = PageContext {
            telemetry,
            attitude: attitude.refresh(now_ms),
            running: RUNNING.load(Ordering::Acquire),
        };
        if let (Some(e), false) = (attitude.last_error(), sensor_reported) {
            warn!("Attitude sensor unavailable: {:?}", e);
            sensor_reported = true;
        }

        let result = if ctx.running {
            match pages.refresh(&ctx, &mut screen) {
                Ok(()) => sink.show_screen(&screen),
                Err(_) => {
                    warn!("Page {} did not fit the screen", pages.active().title());
                    continue;
                }
            }
        } else {
            sink.progress("Press START", 0)
        };
        if let Err(e) = result {
            warn!("Display update failed: {:?}", e);
        }
    }
}
