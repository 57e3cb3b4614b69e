//! LED capability.

use async_trait::async_trait;

use crate::error::Result;

/// Operations a backend must provide to drive LEDs.
#[async_trait]
pub trait LedInterface: Send {
    /// Get the last state the LED was set to.
    fn get_led_state(&self, identifier: u8) -> Result<bool>;

    /// Switch the LED on or off.
    async fn set_led_state(&mut self, identifier: u8, state: bool) -> Result<()>;
}

/// An LED on a board.
pub struct Led<'a, B: ?Sized> {
    identifier: u8,
    backend: &'a mut B,
}

impl<'a, B: LedInterface + ?Sized> Led<'a, B> {
    pub fn new(identifier: u8, backend: &'a mut B) -> Self {
        Self {
            identifier,
            backend,
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn state(&self) -> Result<bool> {
        self.backend.get_led_state(self.identifier)
    }

    pub async fn set_state(&mut self, state: bool) -> Result<()> {
        self.backend.set_led_state(self.identifier, state).await
    }
}
