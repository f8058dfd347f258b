//! Twinwheel - Two-wheel robot velocity control firmware
//!
//! Main firmware binary for RP2040-based differential-drive robots: two
//! quadrature-encoded gear motors on a TB6612-style dual H-bridge, tuned
//! over the serial link.
//!
//! Board wiring (Raspberry Pi Pico):
//!
//! | Function            | Pins            |
//! |---------------------|-----------------|
//! | Serial TX / RX      | GPIO0 / GPIO1   |
//! | Left encoder A / B  | GPIO2 / GPIO3   |
//! | Right encoder A / B | GPIO4 / GPIO5   |
//! | Start / page button | GPIO14 / GPIO15 |
//! | PWMA / PWMB         | GPIO16 / GPIO17 |
//! | AIN1 / AIN2         | GPIO18 / GPIO19 |
//! | BIN1 / BIN2         | GPIO20 / GPIO21 |
//! | STBY                | GPIO22          |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use twinwheel_drivers::encoder::EncoderPins;
use twinwheel_drivers::motor::{HBridge, HBridgeConfig};

use crate::channels::{Shared, ENCODERS};

mod channels;
mod config;
mod display;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// PWM counter top: 125 MHz / (6249 + 1) = 20 kHz, above audible range
const PWM_TOP: u16 = 6249;

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Setpoint and telemetry, created once the configuration is known
static SHARED: StaticCell<Shared> = StaticCell::new();

/// Executor for the encoder edge tasks, preempting the thread executor
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Twinwheel firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();
    let shared: &'static Shared = SHARED.init(Shared::new(config.pid.gains, config.pid.max_target_rpm));

    // Serial link to the tuning tool (115200 baud default)
    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized");

    // Both bridge channels share PWM slice 0 (A = left, B = right)
    let mut pwm_config = pwm::Config::default();
    pwm_config.top = PWM_TOP;
    let pwm = Pwm::new_output_ab(p.PWM_SLICE0, p.PIN_16, p.PIN_17, pwm_config);
    let (left_pwm, right_pwm) = pwm.split();
    let left_pwm = unwrap!(left_pwm);
    let right_pwm = unwrap!(right_pwm);

    let bridge_config = |wheel: usize| HBridgeConfig {
        duty_max: config.actuator.duty_max,
        brake_on_zero: config.actuator.brake_on_zero,
        inverted: config.encoder.inverted[wheel],
    };
    // STBY is common to both channels; the left bridge owns it
    let left_bridge = HBridge::new(
        left_pwm,
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
        Some(Output::new(p.PIN_22, Level::Low)),
        bridge_config(0),
    );
    let right_bridge = HBridge::new(
        right_pwm,
        Output::new(p.PIN_20, Level::Low),
        Output::new(p.PIN_21, Level::Low),
        None,
        bridge_config(1),
    );
    info!("H-bridge initialized (duty max {})", config.actuator.duty_max);

    // Encoder lines idle high; register before the edge tasks start
    let mut left_encoder = EncoderPins::new(Input::new(p.PIN_2, Pull::Up), Input::new(p.PIN_3, Pull::Up));
    let mut right_encoder = EncoderPins::new(Input::new(p.PIN_4, Pull::Up), Input::new(p.PIN_5, Pull::Up));
    let left_channel = unwrap!(left_encoder.register(&ENCODERS, 0));
    let right_channel = unwrap!(right_encoder.register(&ENCODERS, 1));
    info!("Encoders registered");

    let start_button = Input::new(p.PIN_14, Pull::Up);
    let page_button = Input::new(p.PIN_15, Pull::Up);

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner_high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawner_high.spawn(tasks::encoder_task(left_encoder, 0)).unwrap();
    spawner_high.spawn(tasks::encoder_task(right_encoder, 1)).unwrap();

    spawner
        .spawn(tasks::control_task(
            [(left_channel, left_bridge), (right_channel, right_bridge)],
            config.clone(),
            shared,
        ))
        .unwrap();
    spawner.spawn(tasks::serial_rx_task(rx)).unwrap();
    spawner.spawn(tasks::telemetry_task(tx, config.clone(), shared)).unwrap();
    spawner.spawn(tasks::display_task(config, shared)).unwrap();
    spawner.spawn(tasks::start_button_task(start_button)).unwrap();
    spawner.spawn(tasks::page_button_task(page_button)).unwrap();

    info!("All tasks spawned, press START to enable the motors");
}
