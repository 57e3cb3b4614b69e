//! Backends: drivers that implement capability interfaces for one board
//! type over a transport.
//!
//! Each backend is bound to exactly one [`BoardType`] through
//! [`Backend::Board`] and registered with
//! [`register_backend!`](crate::register_backend), which is where its
//! contract is checked.

pub mod sb_arduino;
pub mod sr_motor;

use async_trait::async_trait;

use crate::{board::BoardType, error::Result};

/// A driver for one board type.
#[async_trait]
pub trait Backend: Send {
    /// The board type this backend serves
    type Board: BoardType;

    /// Firmware version reported by the board, if it reports one.
    async fn firmware_version(&mut self) -> Result<Option<String>>;
}
