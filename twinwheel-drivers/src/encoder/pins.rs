//! Encoder input pins
//!
//! Owns the A and B inputs of one channel. The edge task waits for a level
//! change on either line, reads both levels and dispatches them to the
//! registry; all decoding happens in the core.

use embassy_futures::select::{select, Either};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use twinwheel_core::encoder::{ChannelHandle, ChannelRegistry, RegistryError};

/// Encoder pin errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderError {
    /// Reading or waiting on a line failed
    Pin,
    /// Channel could not be registered
    Registry(RegistryError),
}

impl From<RegistryError> for EncoderError {
    fn from(e: RegistryError) -> Self {
        EncoderError::Registry(e)
    }
}

/// The two lines of one encoder channel
pub struct EncoderPins<A, B> {
    a: A,
    b: B,
}

impl<A: InputPin, B: InputPin> EncoderPins<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }

    /// Current (A, B) levels
    pub fn levels(&mut self) -> Result<(bool, bool), EncoderError> {
        let a = self.a.is_high().map_err(|_| EncoderError::Pin)?;
        let b = self.b.is_high().map_err(|_| EncoderError::Pin)?;
        Ok((a, b))
    }

    /// Register the channel with the idle levels read from the pins
    pub fn register<'r, const N: usize>(
        &mut self,
        registry: &'r ChannelRegistry<N>,
        index: usize,
    ) -> Result<ChannelHandle<'r, N>, EncoderError> {
        let (a, b) = self.levels()?;
        Ok(registry.register(index, a, b)?)
    }

    /// Read both lines and hand them to the registry
    ///
    /// Returns false if the read failed or the channel is not registered.
    pub fn dispatch<const N: usize>(&mut self, registry: &ChannelRegistry<N>, index: usize) -> bool {
        match self.levels() {
            Ok((a, b)) => registry.dispatch(index, a, b),
            Err(_) => false,
        }
    }
}

impl<A: InputPin + Wait, B: InputPin + Wait> EncoderPins<A, B> {
    /// Wait for a level change on either line, then read both levels
    pub async fn wait_for_edge(&mut self) -> Result<(bool, bool), EncoderError> {
        let changed = match select(self.a.wait_for_any_edge(), self.b.wait_for_any_edge()).await {
            Either::First(r) => r.is_ok(),
            Either::Second(r) => r.is_ok(),
        };
        if !changed {
            return Err(EncoderError::Pin);
        }
        self.levels()
    }
}
