//! Encoder line handling
//!
//! Reads the two encoder lines of a channel and feeds level changes into
//! the core's [`twinwheel_core::encoder::ChannelRegistry`].

pub mod pins;

pub use pins::{EncoderError, EncoderPins};
