//! Serial receive task
//!
//! Assembles UART bytes into lines and parses them into commands. Parsed
//! commands and rejected lines share one queue, handled in order by the
//! telemetry period, so acknowledgments keep the order of the lines.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use twinwheel_core::control::Inbound;
use twinwheel_protocol::{parse_command, LineAssembler, LineError, Response, Syntax};

use crate::channels::INBOUND;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn serial_rx_task(mut rx: BufferedUartRx) {
    info!("Serial RX task started");

    let mut lines = LineAssembler::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("UART read error: {:?}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            match lines.feed(byte) {
                Ok(Some(line)) => handle_line(line.as_str()).await,
                Ok(None) => {}
                Err(LineError::Overflow) => {
                    warn!("Serial line too long, dropped");
                    acknowledge(Response::Error("line too long"), Syntax::Legacy).await;
                }
                Err(LineError::InvalidUtf8) => {
                    warn!("Serial line not UTF-8, dropped");
                    acknowledge(Response::Error("invalid encoding"), Syntax::Legacy).await;
                }
            }
        }
    }
}

async fn handle_line(line: &str) {
    match parse_command(line) {
        Ok(request) => {
            debug!("Command received: {:?}", request.command);
            INBOUND.send(Inbound::Command(request)).await;
        }
        Err(e) => {
            warn!("Command rejected: {}", e.kind.message());
            acknowledge(Response::Error(e.kind.message()), e.syntax).await;
        }
    }
}

async fn acknowledge(response: Response, syntax: Syntax) {
    INBOUND.send(Inbound::Reject(response, syntax)).await;
}
