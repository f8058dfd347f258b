//! Button tasks
//!
//! - Start button: each press toggles the run gate
//! - Page button: short press switches page, long press is the page action

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{with_timeout, Duration, Instant, Timer};

use twinwheel_core::display::PageInput;

use crate::channels::{PAGE_INPUT, RUN_ENABLE};

/// Contact bounce settle time
const DEBOUNCE_MS: u64 = 20;

/// Hold time that turns a press into a long press
const LONG_PRESS_MS: u64 = 500;

/// Presses shorter than this are treated as noise
const MIN_PRESS_MS: u64 = 50;

#[embassy_executor::task]
pub async fn start_button_task(mut btn: Input<'static>) {
    info!("Start button task started");

    let mut running = false;

    loop {
        btn.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if btn.is_high() {
            continue;
        }

        running = !running;
        RUN_ENABLE.signal(running);
        debug!("Start button: run={}", running);

        btn.wait_for_rising_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
    }
}

#[embassy_executor::task]
pub async fn page_button_task(mut btn: Input<'static>) {
    info!("Page button task started");

    loop {
        btn.wait_for_falling_edge().await;
        let press_start = Instant::now();
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if btn.is_high() {
            continue;
        }

        let input = match with_timeout(Duration::from_millis(LONG_PRESS_MS), btn.wait_for_rising_edge()).await {
            Ok(()) if press_start.elapsed().as_millis() > MIN_PRESS_MS => Some(PageInput::Next),
            Ok(()) => None,
            Err(_) => {
                btn.wait_for_rising_edge().await;
                Some(PageInput::Select)
            }
        };

        if let Some(input) = input {
            debug!("Page button: {:?}", input);
            if PAGE_INPUT.try_send(input).is_err() {
                warn!("Page input channel full, dropping event");
            }
        }
        Timer::after(Duration::from_millis(MIN_PRESS_MS)).await;
    }
}
