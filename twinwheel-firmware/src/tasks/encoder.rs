//! Encoder edge tasks
//!
//! One task per wheel on the high-priority interrupt executor. Each waits
//! for a level change on its A/B lines and hands both levels to the channel
//! registry. No lock is taken here.

use defmt::*;
use embassy_rp::gpio::Input;

use twinwheel_drivers::encoder::EncoderPins;

use crate::channels::ENCODERS;

/// A/B inputs of one wheel
pub type WheelEncoder = EncoderPins<Input<'static>, Input<'static>>;

#[embassy_executor::task(pool_size = 2)]
pub async fn encoder_task(mut pins: WheelEncoder, index: usize) {
    info!("Encoder task {} started", index);

    loop {
        match pins.wait_for_edge().await {
            Ok((a, b)) => {
                if !ENCODERS.dispatch(index, a, b) {
                    warn!("Encoder {} not registered, edge dropped", index);
                }
            }
            Err(e) => warn!("Encoder {} read failed: {:?}", index, e),
        }
    }
}
