//! Student Robotics v4 motor board.

use async_trait::async_trait;

use super::{Board, BoardType};
use crate::{
    backend::{sr_motor::SrMotorBackend, Backend},
    capability::{Capability, Motor, MotorInterface, MotorState},
    error::{Error, Result},
    tracing::prelude::*,
};

/// Number of motor outputs on the board.
pub const MOTOR_COUNT: usize = 2;

/// A motor board with two motor outputs.
pub struct MotorBoard<B = SrMotorBackend> {
    serial: String,
    backend: B,
    firmware_version: Option<Option<String>>,
}

impl<B> BoardType for MotorBoard<B> {
    const NAME: &'static str = "Student Robotics v4 Motor Board";
    const SUPPORTED: &'static [Capability] = &[Capability::Motor];
}

impl<B: Backend + MotorInterface> MotorBoard<B> {
    pub fn new(serial: impl Into<String>, backend: B) -> Self {
        Self {
            serial: serial.into(),
            backend,
            firmware_version: None,
        }
    }

    /// Motor output `identifier` (0 or 1).
    pub fn motor(&mut self, identifier: u8) -> Result<Motor<'_, B>> {
        if usize::from(identifier) >= MOTOR_COUNT {
            return Err(Error::InvalidArgument(format!(
                "{} has no motor {}",
                Self::NAME,
                identifier
            )));
        }
        Ok(Motor::new(identifier, &mut self.backend))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: Backend + MotorInterface> Board for MotorBoard<B> {
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
        for motor in 0..MOTOR_COUNT as u8 {
            if let Err(e) = self.backend.set_motor_state(motor, MotorState::Brake).await {
                warn!(
                    board = Self::NAME,
                    serial = %self.serial,
                    motor,
                    error = %e,
                    "Failed to brake motor"
                );
            }
        }
    }
}
