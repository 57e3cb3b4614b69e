//! Arduino Uno running SourceBots GPIO firmware.

use async_trait::async_trait;
use std::ops::RangeInclusive;

use super::{Board, BoardType};
use crate::{
    backend::{sb_arduino::SbArduinoBackend, Backend},
    capability::{
        Capability, GpioPin, GpioPinInterface, Led, LedInterface, PinId, PinMode,
        UltrasoundInterface, UltrasoundSensor,
    },
    error::{Error, Result},
    tracing::prelude::*,
};

/// Pins usable as digital inputs and outputs (0 and 1 carry the serial link).
pub const DIGITAL_PINS: RangeInclusive<PinId> = 2..=13;

/// Analogue inputs A0 to A5.
pub const ANALOGUE_PINS: RangeInclusive<PinId> = 14..=19;

/// Pin driving the on-board LED.
pub const LED_PIN: PinId = 13;

const DIGITAL_MODES: &[PinMode] = &[
    PinMode::DigitalInput,
    PinMode::DigitalInputPullup,
    PinMode::DigitalOutput,
];

const ANALOGUE_MODES: &[PinMode] = &[PinMode::AnalogueInput];

/// Modes the hardware behind `pin` can take, or `None` if there is no such
/// pin.
pub fn hardware_modes(pin: PinId) -> Option<&'static [PinMode]> {
    if DIGITAL_PINS.contains(&pin) {
        Some(DIGITAL_MODES)
    } else if ANALOGUE_PINS.contains(&pin) {
        Some(ANALOGUE_MODES)
    } else {
        None
    }
}

/// Everything a backend must implement to drive an Arduino Uno.
pub trait ArduinoBackend:
    Backend + GpioPinInterface + LedInterface + UltrasoundInterface
{
}

impl<T> ArduinoBackend for T where
    T: Backend + GpioPinInterface + LedInterface + UltrasoundInterface
{
}

/// An Arduino Uno.
pub struct ArduinoUno<B = SbArduinoBackend> {
    serial: String,
    backend: B,
    firmware_version: Option<Option<String>>,
}

impl<B> BoardType for ArduinoUno<B> {
    const NAME: &'static str = "Arduino Uno";
    const SUPPORTED: &'static [Capability] =
        &[Capability::GpioPin, Capability::Led, Capability::Ultrasound];
}

impl<B: ArduinoBackend> ArduinoUno<B> {
    pub fn new(serial: impl Into<String>, backend: B) -> Self {
        Self {
            serial: serial.into(),
            backend,
            firmware_version: None,
        }
    }

    /// GPIO pin `identifier` (2 to 19).
    pub fn pin(&mut self, identifier: PinId) -> Result<GpioPin<'_, B>> {
        let modes = hardware_modes(identifier).ok_or_else(|| {
            Error::NotSupportedByHardware(format!("{} has no pin {}", Self::NAME, identifier))
        })?;
        GpioPin::new(identifier, &mut self.backend, modes)
    }

    /// The on-board LED. Only identifier 0 exists.
    pub fn led(&mut self, identifier: u8) -> Result<Led<'_, B>> {
        if identifier != 0 {
            return Err(Error::InvalidArgument(format!(
                "{} has no LED {}",
                Self::NAME,
                identifier
            )));
        }
        Ok(Led::new(identifier, &mut self.backend))
    }

    /// An ultrasound sensor wired to two digital pins.
    pub fn ultrasound_sensor(
        &mut self,
        trigger_pin: PinId,
        echo_pin: PinId,
    ) -> Result<UltrasoundSensor<'_, B>> {
        for pin in [trigger_pin, echo_pin] {
            if !DIGITAL_PINS.contains(&pin) {
                return Err(Error::NotSupportedByHardware(format!(
                    "ultrasound sensors need digital pins, {} is not one",
                    pin
                )));
            }
        }
        Ok(UltrasoundSensor::new(trigger_pin, echo_pin, &mut self.backend))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: ArduinoBackend> Board for ArduinoUno<B> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    async fn firmware_version(&mut self) -> Result<Option<String>> {
        if let Some(version) = &self.firmware_version {
            return Ok(version.clone());
        }
        let version = self.backend.firmware_version().await?;
        self.firmware_version = Some(version.clone());
        Ok(version)
    }

    fn supported_components(&self) -> &'static [Capability] {
        Self::SUPPORTED
    }

    async fn make_safe(&mut self) {
        debug!(board = Self::NAME, serial = %self.serial, "Making board safe");
        for pin in DIGITAL_PINS {
            if let Err(e) = self
                .backend
                .set_gpio_pin_mode(pin, PinMode::DigitalInput)
                .await
            {
                warn!(
                    board = Self::NAME,
                    serial = %self.serial,
                    pin,
                    error = %e,
                    "Failed to release pin"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::sb_arduino::tests::{arduino_transport, digital_pin_setup, push_banner},
        transport::mock::ScriptedTransport,
    };
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    async fn board() -> (ArduinoUno<SbArduinoBackend<ScriptedTransport>>, ScriptedTransport) {
        let transport = arduino_transport("2019.6.0");
        let backend = SbArduinoBackend::new(transport.clone()).await.unwrap();
        transport.check_sent(&digital_pin_setup());
        (ArduinoUno::new("TESTSERIAL1", backend), transport)
    }

    #[test]
    fn pin_table() {
        assert_eq!(hardware_modes(2), Some(DIGITAL_MODES));
        assert_eq!(hardware_modes(13), Some(DIGITAL_MODES));
        assert_eq!(hardware_modes(14), Some(ANALOGUE_MODES));
        assert_eq!(hardware_modes(19), Some(ANALOGUE_MODES));
        assert_eq!(hardware_modes(1), None);
        assert_eq!(hardware_modes(20), None);
    }

    #[tokio::test]
    async fn identity() {
        let (mut board, _transport) = board().await;
        assert_eq!(board.name(), "Arduino Uno");
        assert_eq!(board.serial(), "TESTSERIAL1");
        assert_eq!(
            board.firmware_version().await.unwrap().as_deref(),
            Some("2019.6.0")
        );
    }

    #[tokio::test]
    async fn pin_handle_delegates_with_its_identifier() {
        let (mut board, transport) = board().await;

        let mut pin = board.pin(5).unwrap();
        pin.set_mode(PinMode::DigitalOutput).await.unwrap();
        pin.set_digital_state(true).await.unwrap();
        assert!(pin.digital_state().await.unwrap());
        transport.check_sent(b"W 5 L\nW 5 H\n");

        assert!(matches!(
            board.pin(0),
            Err(Error::NotSupportedByHardware(_))
        ));
    }

    #[tokio::test]
    async fn pulldown_rejected_by_handle() {
        let (mut board, transport) = board().await;
        let mut pin = board.pin(4).unwrap();
        assert!(matches!(
            pin.set_mode(PinMode::DigitalInputPulldown).await,
            Err(Error::NotSupportedByHardware(_))
        ));
        transport.check_sent(b"");
    }

    #[tokio::test]
    async fn analogue_pin_handle() {
        let (mut board, transport) = board().await;
        for (channel, raw) in [212, 535, 662, 385, 0, 1023].iter().enumerate() {
            transport.push_line(&format!("> a{channel} {raw}"));
        }
        let mut pin = board.pin(14).unwrap();
        let volts = pin.analogue_value().await.unwrap();
        assert!((volts - 212.0 / 1024.0 * 5.0).abs() < 1e-6);
        transport.check_sent(b"A\n");
        transport.check_all_received_data_consumed();
    }

    #[tokio::test]
    async fn led_drives_pin_13() {
        let (mut board, transport) = board().await;
        board
            .pin(LED_PIN)
            .unwrap()
            .set_mode(PinMode::DigitalOutput)
            .await
            .unwrap();
        transport.check_sent(b"W 13 L\n");

        let mut led = board.led(0).unwrap();
        led.set_state(true).await.unwrap();
        assert!(led.state().unwrap());
        transport.check_sent(b"W 13 H\n");

        assert!(matches!(board.led(1), Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn ultrasound_sensor() {
        let (mut board, transport) = board().await;
        transport.push_line("> 2345");

        let mut sensor = board.ultrasound_sensor(3, 4).unwrap();
        assert_eq!(
            sensor.pulse().await.unwrap(),
            Some(Duration::from_micros(2345))
        );
        transport.check_sent(b"T 3 4\n");

        assert!(board.ultrasound_sensor(3, 14).is_err());
    }

    #[tokio::test]
    async fn make_safe_releases_every_digital_pin() {
        let (mut board, transport) = board().await;
        board
            .pin(7)
            .unwrap()
            .set_mode(PinMode::DigitalOutput)
            .await
            .unwrap();
        transport.take_sent();

        board.make_safe().await;
        transport.check_sent(&digital_pin_setup());
        assert_eq!(
            board.backend().get_gpio_pin_mode(7).unwrap(),
            PinMode::DigitalInput
        );

        // Idempotent
        board.make_safe().await;
        transport.check_sent(&digital_pin_setup());
    }

    #[tokio::test]
    async fn make_safe_swallows_faults() {
        let failing = Arc::new(AtomicBool::new(false));
        let flag = failing.clone();
        let transport = ScriptedTransport::new().with_responder(move |_| {
            let reply = if flag.load(Ordering::SeqCst) {
                "- Something went wrong"
            } else {
                "+ OK"
            };
            vec![reply.to_string()]
        });
        push_banner(&transport, "2019.6.0");
        let backend = SbArduinoBackend::new(transport.clone()).await.unwrap();
        let mut board = ArduinoUno::new("TESTSERIAL1", backend);
        transport.take_sent();

        failing.store(true, Ordering::SeqCst);
        board.make_safe().await;

        // Every pin was still attempted after the first failure.
        transport.check_sent(&digital_pin_setup());
        transport.check_all_received_data_consumed();
    }
}
