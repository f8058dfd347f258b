//! Inter-task communication channels
//!
//! Statics shared between the edge tasks, the periodic tasks and the serial
//! link. The control state itself lives in a `StaticCell` created in `main`
//! because its initial gains come from the loaded configuration.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicBool;

use twinwheel_core::control::{Inbound, SharedControl};
use twinwheel_core::display::PageInput;
use twinwheel_core::encoder::{ChannelRegistry, MAX_CHANNELS};

/// Shared setpoint and telemetry
pub type Shared = SharedControl<CriticalSectionRawMutex>;

/// Channel capacity for received lines waiting for the telemetry period
const INBOUND_CHANNEL_SIZE: usize = 4;

/// Channel capacity for page button events
const PAGE_INPUT_CHANNEL_SIZE: usize = 4;

/// Encoder channels fed by the edge tasks
pub static ENCODERS: ChannelRegistry<MAX_CHANNELS> = ChannelRegistry::new();

/// Run gate changes from the start button (true = actuators enabled)
pub static RUN_ENABLE: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Current run gate state, for the display
pub static RUNNING: AtomicBool = AtomicBool::new(false);

/// Parsed commands and receive-side rejections, in arrival order
pub static INBOUND: Channel<CriticalSectionRawMutex, Inbound, INBOUND_CHANNEL_SIZE> = Channel::new();

/// Page button events for the display task
pub static PAGE_INPUT: Channel<CriticalSectionRawMutex, PageInput, PAGE_INPUT_CHANNEL_SIZE> =
    Channel::new();
