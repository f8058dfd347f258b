//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in twinwheel-core on top of `embedded-hal` 1.0:
//!
//! - Motor drivers (TB6612-style H-bridge channel)
//! - Encoder line sampling for the quadrature decoder

#![no_std]
#![deny(unsafe_code)]

pub mod encoder;
pub mod motor;
