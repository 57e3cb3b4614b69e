//! Physical transport layer for board connections.
//!
//! Backends talk to their boards through a [`LineTransport`]: a duplex byte
//! stream that can write a newline-terminated line, write raw bytes, and read
//! one line with a timeout. The transport knows nothing about the protocol
//! spoken over it.
//!
//! Every fault surfaced here has already been normalized by the
//! [`classify`] module into [`Error::Communication`](crate::error::Error).

pub mod classify;
#[cfg(test)]
pub(crate) mod mock;
pub mod serial;

use async_trait::async_trait;

use crate::{config::SerialSettings, error::Result};

pub use serial::{SerialLineTransport, SerialPortFactory};

/// Line-oriented access to a board.
///
/// Implementations are exclusively owned by one backend and are not
/// reentrant: a caller must read the complete response to one command
/// before writing the next.
#[async_trait]
pub trait LineTransport: Send {
    /// Write `line` followed by a single `\n`.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Write bytes exactly as given.
    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one line, without its terminator.
    ///
    /// Fails with a communication error if no complete line arrives within
    /// the transport's timeout.
    async fn read_line(&mut self) -> Result<String>;

    /// Like [`read_line`](Self::read_line), but a timeout yields `None`
    /// instead of an error. Other faults are still errors.
    async fn try_read_line(&mut self) -> Result<Option<String>>;
}

/// Opens transports by port name.
///
/// Backends take a factory rather than a concrete port so tests can
/// substitute a scripted transport.
pub trait TransportFactory {
    type Transport: LineTransport + 'static;

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        settings: &SerialSettings,
    ) -> Result<Self::Transport>;
}
