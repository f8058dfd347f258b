//! Encoder channel registry
//!
//! A fixed-capacity table of decoders keyed by channel index. The edge
//! interrupt resolves its channel by index through [`ChannelRegistry::dispatch`];
//! the sampling task holds the single [`ChannelHandle`] for each channel it
//! registered. Channels must be unregistered before the consumer goes away;
//! after that, edge interrupts for the index are ignored.
//!
//! The registry is meant to live in a `static` so the interrupt and the tasks
//! share it without pointers.

use portable_atomic::{AtomicU8, Ordering};

use super::quadrature::QuadratureDecoder;

/// Channel count used by the firmware (one per wheel, room for two more)
pub const MAX_CHANNELS: usize = 4;

const VACANT: u8 = 0;
const ARMED: u8 = 1;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Index is beyond the registry capacity
    IndexOutOfRange,
    /// Channel already has a consumer
    AlreadyRegistered,
}

/// Fixed-capacity decoder table
pub struct ChannelRegistry<const N: usize> {
    decoders: [QuadratureDecoder; N],
    state: [AtomicU8; N],
}

impl<const N: usize> Default for ChannelRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ChannelRegistry<N> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            decoders: [const { QuadratureDecoder::new() }; N],
            state: [const { AtomicU8::new(VACANT) }; N],
        }
    }

    /// Claim a channel
    ///
    /// `a` and `b` are the current line levels; the decoder is primed and its
    /// count cleared before edges are accepted. Only one handle per channel
    /// can exist at a time.
    pub fn register(&self, index: usize, a: bool, b: bool) -> Result<ChannelHandle<'_, N>, RegistryError> {
        let state = self.state.get(index).ok_or(RegistryError::IndexOutOfRange)?;
        if state.load(Ordering::Acquire) != VACANT {
            return Err(RegistryError::AlreadyRegistered);
        }

        let decoder = &self.decoders[index];
        decoder.prime(a, b);
        decoder.reset_and_read();

        state
            .compare_exchange(VACANT, ARMED, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RegistryError::AlreadyRegistered)?;

        Ok(ChannelHandle {
            registry: self,
            index,
        })
    }

    /// Route an edge interrupt to its channel
    ///
    /// Returns false (and does nothing) if the channel is not registered.
    pub fn dispatch(&self, index: usize, a: bool, b: bool) -> bool {
        match self.state.get(index) {
            Some(state) if state.load(Ordering::Acquire) == ARMED => {
                self.decoders[index].on_edge(a, b);
                true
            }
            _ => false,
        }
    }

    /// Check whether a channel currently has a consumer
    pub fn is_registered(&self, index: usize) -> bool {
        self.state
            .get(index)
            .is_some_and(|s| s.load(Ordering::Acquire) == ARMED)
    }

    fn release(&self, index: usize) {
        self.state[index].store(VACANT, Ordering::Release);
    }
}

/// Exclusive consumer handle for one registered channel
pub struct ChannelHandle<'r, const N: usize> {
    registry: &'r ChannelRegistry<N>,
    index: usize,
}

impl<const N: usize> ChannelHandle<'_, N> {
    /// Channel index in the registry
    pub fn index(&self) -> usize {
        self.index
    }

    /// Take the pulses accumulated since the last call
    pub fn reset_and_read(&self) -> i32 {
        self.registry.decoders[self.index].reset_and_read()
    }

    /// Release the channel; later edges for this index are ignored
    pub fn unregister(self) {
        self.registry.release(self.index);
    }
}

impl<const N: usize> core::fmt::Debug for ChannelHandle<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChannelHandle").field("index", &self.index).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    #[test]
    fn test_register_and_dispatch() {
        let registry: ChannelRegistry<2> = ChannelRegistry::new();
        let handle = registry.register(0, false, false).unwrap();

        for (a, b) in FORWARD {
            assert!(registry.dispatch(0, a, b));
        }
        assert_eq!(handle.reset_and_read(), 4);
        assert_eq!(handle.reset_and_read(), 0);
    }

    #[test]
    fn test_dispatch_unregistered_is_ignored() {
        let registry: ChannelRegistry<2> = ChannelRegistry::new();
        assert!(!registry.dispatch(1, true, false));
        assert!(!registry.dispatch(5, true, false));
    }

    #[test]
    fn test_single_consumer_per_channel() {
        let registry: ChannelRegistry<2> = ChannelRegistry::new();
        let _first = registry.register(1, false, false).unwrap();
        assert_eq!(
            registry.register(1, false, false).unwrap_err(),
            RegistryError::AlreadyRegistered
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let registry: ChannelRegistry<2> = ChannelRegistry::new();
        assert_eq!(
            registry.register(2, false, false).unwrap_err(),
            RegistryError::IndexOutOfRange
        );
    }

    #[test]
    fn test_unregister_stops_dispatch_and_frees_slot() {
        let registry: ChannelRegistry<1> = ChannelRegistry::new();
        let handle = registry.register(0, false, false).unwrap();
        registry.dispatch(0, true, false);
        handle.unregister();

        assert!(!registry.is_registered(0));
        assert!(!registry.dispatch(0, true, true));

        // Re-registering starts from a clean count
        let handle = registry.register(0, true, false).unwrap();
        assert_eq!(handle.reset_and_read(), 0);
    }

    #[test]
    fn test_channels_are_independent_under_concurrency() {
        const PER_CHANNEL: usize = 10_000;
        let registry: ChannelRegistry<MAX_CHANNELS> = ChannelRegistry::new();
        let handles: [_; 2] = [
            registry.register(0, false, false).unwrap(),
            registry.register(1, false, false).unwrap(),
        ];

        std::thread::scope(|s| {
            for (index, forward) in [(0usize, true), (1usize, false)] {
                let registry = &registry;
                s.spawn(move || {
                    for i in 0..PER_CHANNEL {
                        let step = if forward { (i + 1) % 4 } else { (4 - (i + 1) % 4) % 4 };
                        let (a, b) = if step == 0 { (false, false) } else { FORWARD[step - 1] };
                        registry.dispatch(index, a, b);
                    }
                });
            }
        });

        assert_eq!(handles[0].reset_and_read(), PER_CHANNEL as i32);
        assert_eq!(handles[1].reset_and_read(), -(PER_CHANNEL as i32));
    }
}
