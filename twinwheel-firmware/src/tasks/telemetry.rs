//! Telemetry and command task
//!
//! Once per telemetry period:
//! 1. handle received lines in order, acknowledging each; a command that
//!    cannot get the lock within the lock timeout stays pending for the
//!    next period
//! 2. snapshot the shared state and write the data record and plotter lines
//!
//! The shared lock is never held across UART writes.

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embassy_time::{with_timeout, Duration, Ticker};
use embedded_io_async::Write;
use heapless::String;

use twinwheel_core::config::RobotConfig;
use twinwheel_core::control::{CommandInbox, InboxStep, TelemetrySnapshot, WHEELS};
use twinwheel_protocol::{encode_record, encode_response, Response, Syntax, TelemetryRecord};

use crate::channels::{Shared, INBOUND};

/// Plotter block: four loop values plus speed and direction per wheel
const PLOT_BUF_SIZE: usize = 32 * (4 + 2 * WHEELS);

#[embassy_executor::task]
pub async fn telemetry_task(mut tx: BufferedUartTx, config: RobotConfig, shared: &'static Shared) {
    info!("Telemetry task started: every {} ms", config.periods.telemetry_ms);

    let lock_timeout = Duration::from_millis(config.timing.lock_timeout_ms as u64);
    let mut ticker = Ticker::every(Duration::from_millis(config.periods.telemetry_ms as u64));
    let mut inbox = CommandInbox::new();

    loop {
        ticker.next().await;

        let mut waited = false;
        loop {
            match inbox.step(shared, || INBOUND.try_receive().ok()) {
                InboxStep::Reply(response, syntax) => {
                    if response.is_success() {
                        debug!("Command applied: {}", response.message());
                    } else {
                        warn!("Command rejected: {}", response.message());
                    }
                    send_ack(&mut tx, &response, syntax).await;
                }
                InboxStep::Idle => break,
                // Wait for the lock once per period, then retry
                InboxStep::Contended if !waited => {
                    waited = true;
                    if with_timeout(lock_timeout, shared.lock()).await.is_err() {
                        warn!("Command lock timeout, retrying next period");
                        break;
                    }
                }
                InboxStep::Contended => {
                    warn!("Command lock contended, retrying next period");
                    break;
                }
            }
        }

        let snapshot = match with_timeout(lock_timeout, shared.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!("Telemetry lock timeout, record skipped");
                continue;
            }
        };
        send_telemetry(&mut tx, &snapshot).await;
    }
}

async fn send_ack(tx: &mut BufferedUartTx, response: &Response, syntax: Syntax) {
    let line = encode_response(response, syntax);
    if let Err(e) = tx.write_all(line.as_bytes()).await {
        warn!("Failed to send acknowledgment: {:?}", e);
    }
}

async fn send_telemetry(tx: &mut BufferedUartTx, t: &TelemetrySnapshot) {
    let record = TelemetryRecord::new(t.timestamp_ms, t.target_rpm, t.measured_rpm, t.output, t.gains);
    match encode_record(&record) {
        Some(line) => {
            if let Err(e) = tx.write_all(line.as_bytes()).await {
                warn!("Failed to send telemetry: {:?}", e);
                return;
            }
        }
        None => warn!("Telemetry record did not fit"),
    }

    let mut plot: String<PLOT_BUF_SIZE> = String::new();
    if plot_lines(&mut plot, t).is_err() {
        warn!("Plotter block did not fit");
        return;
    }
    if let Err(e) = tx.write_all(plot.as_bytes()).await {
        warn!("Failed to send plotter lines: {:?}", e);
    }
    trace!("Telemetry sent at {} ms", t.timestamp_ms);
}

fn plot_lines<W: core::fmt::Write>(out: &mut W, t: &TelemetrySnapshot) -> core::fmt::Result {
    use twinwheel_protocol::{write_plot_int, write_plot_line};

    write_plot_line(out, "target_rpm", t.target_rpm)?;
    write_plot_line(out, "current_rpm", t.measured_rpm)?;
    write_plot_line(out, "motor_output", t.output)?;
    write_plot_line(out, "error", t.error())?;

    let mut name: String<16> = String::new();
    for (i, wheel) in t.wheels.iter().enumerate() {
        name.clear();
        write!(name, "wheel{}_rpm", i + 1)?;
        write_plot_line(out, &name, wheel.rpm)?;
        name.clear();
        write!(name, "wheel{}_direction", i + 1)?;
        write_plot_int(out, &name, wheel.direction.code().into())?;
    }
    Ok(())
}
