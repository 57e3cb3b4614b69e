//! Ultrasound distance sensor capability.
//!
//! A sensor is a pair of pins: the trigger pin is pulsed high and the echo
//! pin reports a pulse whose width is the sound's round-trip time. `None`
//! means no echo arrived, which is a normal outcome rather than an error.

use async_trait::async_trait;
use std::time::Duration;

use super::gpio::PinId;
use crate::error::Result;

/// Operations a backend must provide to drive ultrasound sensors.
#[async_trait]
pub trait UltrasoundInterface: Send {
    /// Send a trigger pulse and measure the echo pulse width.
    async fn get_ultrasound_pulse(
        &mut self,
        trigger_pin: PinId,
        echo_pin: PinId,
    ) -> Result<Option<Duration>>;

    /// Send a trigger pulse and get the measured distance in metres.
    async fn get_ultrasound_distance(
        &mut self,
        trigger_pin: PinId,
        echo_pin: PinId,
    ) -> Result<Option<f32>>;
}

/// An ultrasound sensor wired to two pins of a board.
pub struct UltrasoundSensor<'a, B: ?Sized> {
    trigger_pin: PinId,
    echo_pin: PinId,
    backend: &'a mut B,
}

impl<'a, B: UltrasoundInterface + ?Sized> UltrasoundSensor<'a, B> {
    pub fn new(trigger_pin: PinId, echo_pin: PinId, backend: &'a mut B) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            backend,
        }
    }

    pub fn pins(&self) -> (PinId, PinId) {
        (self.trigger_pin, self.echo_pin)
    }

    /// Round-trip time of the last echo.
    pub async fn pulse(&mut self) -> Result<Option<Duration>> {
        self.backend
            .get_ultrasound_pulse(self.trigger_pin, self.echo_pin)
            .await
    }

    /// Distance to the nearest obstacle, in metres.
    pub async fn distance(&mut self) -> Result<Option<f32>> {
        self.backend
            .get_ultrasound_distance(self.trigger_pin, self.echo_pin)
            .await
    }
}
