//! Capability-based control of hobbyist robotics boards.
//!
//! A [`board`] is a named device with a serial number. It exposes a fixed
//! set of [`capability`] kinds (GPIO pins, LEDs, ultrasound sensors,
//! motors) and delegates every operation to a [`backend`] driver, which
//! talks to the hardware through a [`transport`].
//!
//! Backends declare the board they serve and the capabilities they provide
//! with [`register_backend!`]; mismatches fail to compile, and the
//! [`contract`] registry can re-check them at startup.

pub mod backend;
pub mod board;
pub mod capability;
pub mod config;
pub mod contract;
pub mod error;
pub mod tracing;
pub mod transport;

#[doc(hidden)]
pub use inventory;
