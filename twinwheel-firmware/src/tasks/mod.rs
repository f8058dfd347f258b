//! Embassy async tasks
//!
//! Edge tasks run on the high-priority interrupt executor; everything else
//! runs on the thread executor and talks through [`crate::channels`].

pub mod buttons;
pub mod control;
pub mod display;
pub mod encoder;
pub mod serial;
pub mod telemetry;

pub use buttons::{page_button_task, start_button_task};
pub use control::control_task;
pub use display::display_task;
pub use encoder::encoder_task;
pub use serial::serial_rx_task;
pub use telemetry::telemetry_task;
