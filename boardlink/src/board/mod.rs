//! Board façades.
//!
//! A board is the stable identity of one physical device: its name, serial
//! number and firmware version, plus the fixed set of component kinds it
//! supports. It exclusively owns one backend and delegates every capability
//! operation to it.
//!
//! Two traits split the static and dynamic halves:
//!
//! - [`BoardType`] carries what is known at type-definition time and feeds
//!   the [`contract`](crate::contract) registry.
//! - [`Board`] is object safe, so the daemon can hold heterogeneous boards
//!   and make them all safe at shutdown.

pub mod arduino;
pub mod motor;

use async_trait::async_trait;
use std::fmt;

use crate::{
    backend::{sb_arduino::SbArduinoBackend, sr_motor::SrMotorBackend},
    capability::Capability,
    config::{BoardConfig, BoardKind, SerialSettings},
    error::Result,
    tracing::prelude::*,
    transport::TransportFactory,
};

pub use arduino::ArduinoUno;
pub use motor::MotorBoard;

/// Static description of a board type.
pub trait BoardType {
    /// Human-readable board name (e.g., "Arduino Uno")
    const NAME: &'static str;

    /// Component kinds every board of this type exposes
    const SUPPORTED: &'static [Capability];
}

/// A board instance.
#[async_trait]
pub trait Board: Send {
    fn name(&self) -> &'static str;

    fn serial(&self) -> &str;

    /// Firmware version reported by the board, if it reports one.
    ///
    /// Fetched from the backend on first use and cached afterwards.
    async fn firmware_version(&mut self) -> Result<Option<String>>;

    fn supported_components(&self) -> &'static [Capability];

    /// Put every output into an inert state.
    ///
    /// Best effort and idempotent: safe to call repeatedly, during shutdown
    /// or after an error. Faults are logged, never returned.
    async fn make_safe(&mut self);
}

impl fmt::Display for dyn Board + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name(), self.serial())
    }
}

impl fmt::Debug for dyn Board + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name())
            .field("serial", &self.serial())
            .finish()
    }
}

/// Open the board described by `config` through `factory`.
pub async fn open<F: TransportFactory>(
    config: &BoardConfig,
    settings: &SerialSettings,
    factory: &F,
) -> Result<Box<dyn Board>> {
    debug!(kind = ?config.kind, port = %config.port, serial = %config.serial, "Opening board");
    let board: Box<dyn Board> = match config.kind {
        BoardKind::SbArduino => {
            let backend = SbArduinoBackend::open(&config.port, factory, settings).await?;
            Box::new(ArduinoUno::new(config.serial.clone(), backend))
        }
        BoardKind::SrV4Motor => {
            let backend = SrMotorBackend::open(&config.port, factory, settings).await?;
            Box::new(MotorBoard::new(config.serial.clone(), backend))
        }
    };
    info!(board = %board, port = %config.port, "Board ready");
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::sb_arduino::tests::arduino_transport,
        transport::mock::ScriptedFactory,
    };

    #[tokio::test]
    async fn open_arduino_from_config() {
        let transport = arduino_transport("2019.6.0");
        let factory = ScriptedFactory {
            transport: transport.clone(),
        };
        let config = BoardConfig {
            kind: BoardKind::SbArduino,
            port: "/dev/ttyACM0".into(),
            serial: "ARDUINO1".into(),
        };

        let mut board = open(&config, &SerialSettings::default(), &factory)
            .await
            .unwrap();

        assert_eq!(board.to_string(), "Arduino Uno - ARDUINO1");
        assert_eq!(
            board.firmware_version().await.unwrap().as_deref(),
            Some("2019.6.0")
        );
        assert_eq!(
            board.supported_components(),
            &[Capability::GpioPin, Capability::Led, Capability::Ultrasound]
        );
        transport.check_all_received_data_consumed();
    }

    #[tokio::test]
    async fn open_failure_is_surfaced() {
        let transport = arduino_transport("2018.7.0");
        let factory = ScriptedFactory { transport };
        let config = BoardConfig {
            kind: BoardKind::SbArduino,
            port: "/dev/ttyACM0".into(),
            serial: "ARDUINO1".into(),
        };

        let err = open(&config, &SerialSettings::default(), &factory)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("2018.7.0"), "{err}");
    }
}
