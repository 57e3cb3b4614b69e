//! SourceBots Arduino backend.
//!
//! Drives an Arduino Uno running the SBDuino GPIO firmware over its USB
//! serial link. The backend owns the authoritative view of every pin's mode
//! and output level: a mode or level is only recorded once the firmware has
//! acknowledged it, and requests the hardware cannot satisfy are rejected
//! before anything is written.
//!
//! # Handshake
//!
//! On connection the firmware prints a banner line and then an
//! identification line carrying its version. Firmware older than
//! [`MIN_FIRMWARE_VERSION`] is refused. Every digital pin is then put into
//! tri-state input, in ascending order, so the board starts from a known
//! state whatever the previous session left behind.
//!
//! # Desynchronization
//!
//! There is no way to abandon a reply part-way. If an exchange fails after
//! its command was written (timeout, malformed line), unread reply lines may
//! still be in flight and the backend should be dropped and reopened.

pub mod protocol;

use async_trait::async_trait;
use std::{collections::BTreeMap, time::Duration};

use self::protocol::{
    parse_analogue, parse_count, parse_digital, raw_to_voltage, Command, FirmwareVersion,
    PinDrive, ReplyLine, MIN_FIRMWARE_VERSION,
};
use super::Backend;
use crate::{
    board::arduino::{hardware_modes, ArduinoUno, ANALOGUE_PINS, DIGITAL_PINS, LED_PIN},
    capability::{GpioPinInterface, LedInterface, PinId, PinMode, UltrasoundInterface},
    config::SerialSettings,
    error::{Error, Result},
    register_backend,
    tracing::prelude::*,
    transport::{LineTransport, SerialLineTransport, TransportFactory},
};

/// Serial baud rate of the firmware.
pub const BAUD_RATE: u32 = 115_200;

/// Read timeouts tolerated while waiting for the boot banner. Opening the
/// port resets the board, and the bootloader runs before the firmware
/// prints anything.
pub const BOOT_READ_ATTEMPTS: usize = 25;

/// Local view of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PinDescriptor {
    mode: PinMode,
    /// Last level written, or implied by entering output mode.
    state: bool,
}

/// Backend for an Arduino running SourceBots firmware.
pub struct SbArduinoBackend<T = SerialLineTransport> {
    transport: T,
    pins: BTreeMap<PinId, PinDescriptor>,
    firmware_version: FirmwareVersion,
}

register_backend!(SbArduinoBackend => ArduinoUno: [GpioPin, Led, Ultrasound]);

impl<T: LineTransport> SbArduinoBackend<T> {
    /// Open `port` through `factory` and perform the handshake.
    pub async fn open<F>(port: &str, factory: &F, settings: &SerialSettings) -> Result<Self>
    where
        F: TransportFactory<Transport = T>,
    {
        let transport = factory.open(port, BAUD_RATE, settings)?;
        Self::new(transport).await
    }

    /// Perform the handshake over an already-open transport.
    pub async fn new(mut transport: T) -> Result<Self> {
        let banner = wait_for_banner(&mut transport).await?;
        trace!(banner = %banner, "Discarding firmware banner");

        let identification = transport.read_line().await?;
        let firmware_version = FirmwareVersion::from_identification(&identification)?;
        if firmware_version < MIN_FIRMWARE_VERSION {
            return Err(Error::Communication(format!(
                "Unexpected firmware version: {}, expected at least {}",
                firmware_version, MIN_FIRMWARE_VERSION
            )));
        }
        debug!(version = %firmware_version, "Arduino firmware accepted");

        let pins = DIGITAL_PINS
            .map(|pin| {
                (
                    pin,
                    PinDescriptor {
                        mode: PinMode::DigitalInput,
                        state: false,
                    },
                )
            })
            .chain(ANALOGUE_PINS.map(|pin| {
                (
                    pin,
                    PinDescriptor {
                        mode: PinMode::AnalogueInput,
                        state: false,
                    },
                )
            }))
            .collect();

        let mut backend = Self {
            transport,
            pins,
            firmware_version,
        };
        for pin in DIGITAL_PINS {
            backend
                .set_gpio_pin_mode(pin, PinMode::DigitalInput)
                .await?;
        }
        Ok(backend)
    }

    /// Send one command and collect the data lines of its reply.
    async fn command(&mut self, command: Command) -> Result<Vec<String>> {
        self.transport.write_line(&command.to_string()).await?;

        let mut results = Vec::new();
        loop {
            let line = self.transport.read_line().await?;
            match ReplyLine::parse(&line)? {
                ReplyLine::Data(payload) => results.push(payload),
                ReplyLine::Comment(text) => debug!(comment = %text, "Arduino comment"),
                ReplyLine::Ok => return Ok(results),
                ReplyLine::Failure(reason) => {
                    return Err(Error::Communication(format!("Arduino error: {}", reason)))
                }
            }
        }
    }

    /// Send a command whose reply carries exactly one data line.
    async fn query(&mut self, command: Command) -> Result<String> {
        let mut results = self.command(command).await?;
        if results.len() != 1 {
            return Err(Error::Communication(format!(
                "Arduino sent {} results for {:?}, expected one: {:?}",
                results.len(),
                command.to_string(),
                results
            )));
        }
        Ok(results.remove(0))
    }

    fn pin(&self, identifier: PinId) -> Result<&PinDescriptor> {
        self.pins.get(&identifier).ok_or_else(|| {
            Error::NotSupportedByHardware(format!("pin {} does not exist", identifier))
        })
    }

    fn pin_mut(&mut self, identifier: PinId) -> Result<&mut PinDescriptor> {
        self.pins.get_mut(&identifier).ok_or_else(|| {
            Error::NotSupportedByHardware(format!("pin {} does not exist", identifier))
        })
    }

    fn require_digital(&self, identifier: PinId) -> Result<&PinDescriptor> {
        if !DIGITAL_PINS.contains(&identifier) {
            return Err(Error::NotSupportedByHardware(format!(
                "digital operations are not supported on pin {}",
                identifier
            )));
        }
        self.pin(identifier)
    }

    fn require_analogue(&self, identifier: PinId) -> Result<&PinDescriptor> {
        if !ANALOGUE_PINS.contains(&identifier) {
            return Err(Error::NotSupportedByHardware(format!(
                "analogue operations are not supported on pin {}",
                identifier
            )));
        }
        self.pin(identifier)
    }

    fn require_output(&self, identifier: PinId) -> Result<&PinDescriptor> {
        let pin = self.require_digital(identifier)?;
        if pin.mode != PinMode::DigitalOutput {
            return Err(Error::PreconditionViolation(format!(
                "pin {} must be in {} mode, but is {}",
                identifier,
                PinMode::DigitalOutput,
                pin.mode
            )));
        }
        Ok(pin)
    }

    /// Record the modes the firmware forces during an ultrasound reading.
    ///
    /// The echo pin is applied last, so a sensor using one pin for both ends
    /// up as an input.
    fn ultrasound_side_effects(&mut self, trigger: PinId, echo: PinId) -> Result<()> {
        *self.pin_mut(trigger)? = PinDescriptor {
            mode: PinMode::DigitalOutput,
            state: false,
        };
        self.pin_mut(echo)?.mode = PinMode::DigitalInput;
        Ok(())
    }

    async fn ultrasound(&mut self, command: Command, trigger: PinId, echo: PinId) -> Result<u32> {
        self.require_digital(trigger)?;
        self.require_digital(echo)?;
        let payload = self.query(command).await?;
        let count = parse_count(&payload)?;
        self.ultrasound_side_effects(trigger, echo)?;
        Ok(count)
    }
}

/// Read the first line the firmware prints after reset, allowing up to
/// [`BOOT_READ_ATTEMPTS`] timeouts before it appears.
async fn wait_for_banner<T: LineTransport>(transport: &mut T) -> Result<String> {
    for attempt in 1..=BOOT_READ_ATTEMPTS {
        if let Some(line) = transport.try_read_line().await? {
            return Ok(line);
        }
        trace!(attempt, "Waiting for Arduino to boot");
    }
    Err(Error::Communication(format!(
        "Arduino sent no banner after {} read timeouts; is the board correctly powered?",
        BOOT_READ_ATTEMPTS
    )))
}

#[async_trait]
impl<T: LineTransport> Backend for SbArduinoBackend<T> {
    type Board = ArduinoUno<Self>;

    async fn firmware_version(&mut self) -> Result<Option<String>> {
        Ok(Some(self.firmware_version.to_string()))
    }
}

#[async_trait]
impl<T: LineTransport> GpioPinInterface for SbArduinoBackend<T> {
    async fn set_gpio_pin_mode(&mut self, identifier: PinId, mode: PinMode) -> Result<()> {
        let supported = hardware_modes(identifier).ok_or_else(|| {
            Error::NotSupportedByHardware(format!("pin {} does not exist", identifier))
        })?;
        if !supported.contains(&mode) {
            return Err(Error::NotSupportedByHardware(format!(
                "pin {} does not support {}",
                identifier, mode
            )));
        }

        let state = self.pin(identifier)?.state;
        if let Some(drive) = PinDrive::for_mode(mode, state) {
            self.command(Command::Write {
                pin: identifier,
                drive,
            })
            .await?;
        }
        self.pin_mut(identifier)?.mode = mode;
        Ok(())
    }

    fn get_gpio_pin_mode(&self, identifier: PinId) -> Result<PinMode> {
        Ok(self.pin(identifier)?.mode)
    }

    async fn write_gpio_pin_digital_state(&mut self, identifier: PinId, state: bool) -> Result<()> {
        self.require_output(identifier)?;
        self.command(Command::Write {
            pin: identifier,
            drive: PinDrive::for_level(state),
        })
        .await?;
        self.pin_mut(identifier)?.state = state;
        Ok(())
    }

    fn get_gpio_pin_digital_state(&self, identifier: PinId) -> Result<bool> {
        Ok(self.require_output(identifier)?.state)
    }

    async fn read_gpio_pin_digital_state(&mut self, identifier: PinId) -> Result<bool> {
        let pin = self.require_digital(identifier)?;
        if !pin.mode.is_digital_input() {
            return Err(Error::PreconditionViolation(format!(
                "pin {} must be in a digital input mode, but is {}",
                identifier, pin.mode
            )));
        }
        let payload = self.query(Command::Read { pin: identifier }).await?;
        parse_digital(&payload)
    }

    async fn read_gpio_pin_analogue_value(&mut self, identifier: PinId) -> Result<f32> {
        self.require_analogue(identifier)?;
        let channel = identifier - ANALOGUE_PINS.start();

        // Every channel is reported; all lines must be read regardless.
        let results = self.command(Command::ReadAnalogue).await?;
        let mut reading = None;
        for payload in &results {
            let (index, raw) = parse_analogue(payload)?;
            if index == channel {
                reading = Some(raw);
            }
        }
        let raw = reading.ok_or_else(|| {
            Error::Communication(format!(
                "Arduino sent no reading for analogue channel {}: {:?}",
                channel, results
            ))
        })?;
        Ok(raw_to_voltage(raw))
    }

    async fn write_gpio_pin_dac_value(&mut self, identifier: PinId, _scaled_value: f32) -> Result<()> {
        self.pin(identifier)?;
        Err(Error::NotSupportedByHardware(format!(
            "pin {} has no DAC",
            identifier
        )))
    }

    async fn write_gpio_pin_pwm_value(&mut self, identifier: PinId, _duty_cycle: f32) -> Result<()> {
        self.pin(identifier)?;
        Err(Error::NotSupportedByHardware(format!(
            "PWM is not supported on pin {}",
            identifier
        )))
    }
}

#[async_trait]
impl<T: LineTransport> LedInterface for SbArduinoBackend<T> {
    fn get_led_state(&self, identifier: u8) -> Result<bool> {
        require_led(identifier)?;
        self.get_gpio_pin_digital_state(LED_PIN)
    }

    async fn set_led_state(&mut self, identifier: u8, state: bool) -> Result<()> {
        require_led(identifier)?;
        self.write_gpio_pin_digital_state(LED_PIN, state).await
    }
}

fn require_led(identifier: u8) -> Result<()> {
    if identifier == 0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid LED identifier {}, the only LED is 0",
            identifier
        )))
    }
}

#[async_trait]
impl<T: LineTransport> UltrasoundInterface for SbArduinoBackend<T> {
    async fn get_ultrasound_pulse(
        &mut self,
        trigger_pin: PinId,
        echo_pin: PinId,
    ) -> Result<Option<Duration>> {
        let command = Command::UltrasoundPulse {
            trigger: trigger_pin,
            echo: echo_pin,
        };
        let microseconds = self.ultrasound(command, trigger_pin, echo_pin).await?;
        Ok((microseconds != 0).then(|| Duration::from_micros(microseconds.into())))
    }

    async fn get_ultrasound_distance(
        &mut self,
        trigger_pin: PinId,
        echo_pin: PinId,
    ) -> Result<Option<f32>> {
        let command = Command::UltrasoundDistance {
            trigger: trigger_pin,
            echo: echo_pin,
        };
        let millimetres = self.ultrasound(command, trigger_pin, echo_pin).await?;
        Ok((millimetres != 0).then(|| millimetres as f32 / 1000.0))
    }
}
