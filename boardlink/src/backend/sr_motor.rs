//! Student Robotics v4 motor board backend.
//!
//! The board speaks a tiny binary protocol: each command is a command byte,
//! optionally followed by one data byte. Only the version query replies, with
//! a single text line such as `MCV4B:3`. Motor state cannot be read back, so
//! the backend remembers the last state it set.

use async_trait::async_trait;

use super::Backend;
use crate::{
    board::motor::{MotorBoard, MOTOR_COUNT},
    capability::{MotorInterface, MotorState},
    config::SerialSettings,
    error::{Error, Result},
    register_backend,
    tracing::prelude::*,
    transport::{LineTransport, SerialLineTransport, TransportFactory},
};

/// Serial baud rate of the motor board.
pub const BAUD_RATE: u32 = 1_000_000;

const CMD_VERSION: u8 = 1;
const CMD_MOTOR: [u8; MOTOR_COUNT] = [2, 3];

const SPEED_COAST: u8 = 1;
const SPEED_BRAKE: u8 = 2;

/// Full scale of a power value. Kept symmetric around [`POWER_ZERO`] so
/// that it never reaches the coast and brake codes.
const POWER_SCALE: f32 = 125.0;
const POWER_ZERO: u8 = 128;

const MODEL: &str = "MCV4B";
const SUPPORTED_FIRMWARE: &str = "3";

/// Encode a motor state as the data byte of a motor command.
fn encode_state(state: MotorState) -> Result<u8> {
    match state {
        MotorState::Coast => Ok(SPEED_COAST),
        MotorState::Brake => Ok(SPEED_BRAKE),
        MotorState::Power(power) => {
            if !(-1.0..=1.0).contains(&power) {
                return Err(Error::InvalidArgument(format!(
                    "motor power must be between -1 and 1, got {}",
                    power
                )));
            }
            let offset = (power * POWER_SCALE).round_ties_even() as i16;
            Ok((POWER_ZERO as i16 + offset) as u8)
        }
    }
}

/// Split a version reply into its model and version parts.
fn parse_version(line: &str) -> Result<&str> {
    let model = line.get(..MODEL.len()).unwrap_or(line);
    if model != MODEL {
        return Err(Error::Communication(format!(
            "Unexpected model string: {}, expected {}",
            model, MODEL
        )));
    }
    Ok(line.get(MODEL.len() + 1..).unwrap_or(""))
}

/// Backend for the Student Robotics v4 motor board.
pub struct SrMotorBackend<T = SerialLineTransport> {
    transport: T,
    state: [MotorState; MOTOR_COUNT],
}

register_backend!(SrMotorBackend => MotorBoard: [Motor]);

impl<T: LineTransport> SrMotorBackend<T> {
    /// Open `port` through `factory`, check the firmware and brake both
    /// motors.
    pub async fn open<F>(port: &str, factory: &F, settings: &SerialSettings) -> Result<Self>
    where
        F: TransportFactory<Transport = T>,
    {
        let transport = factory.open(port, BAUD_RATE, settings)?;
        Self::new(transport).await
    }

    pub async fn new(transport: T) -> Result<Self> {
        let mut backend = Self {
            transport,
            state: [MotorState::Brake; MOTOR_COUNT],
        };

        let version = backend.query_version().await?;
        if version != SUPPORTED_FIRMWARE {
            return Err(Error::Communication(format!(
                "Unexpected firmware version: {}, expected: {:?}",
                version, SUPPORTED_FIRMWARE
            )));
        }
        debug!(version = %version, "Motor board firmware accepted");

        for identifier in 0..MOTOR_COUNT as u8 {
            backend
                .set_motor_state(identifier, MotorState::Brake)
                .await?;
        }
        Ok(backend)
    }

    async fn send_command(&mut self, command: u8, data: Option<u8>) -> Result<()> {
        let mut message = vec![command];
        message.extend(data);
        trace!(tx = ?message, "Motor board command");
        self.transport.write_raw(&message).await
    }

    async fn query_version(&mut self) -> Result<String> {
        self.send_command(CMD_VERSION, None).await?;
        let line = self.transport.read_line().await?;
        parse_version(&line).map(str::to_string)
    }
}

fn motor_index(identifier: u8) -> Result<usize> {
    let index = usize::from(identifier);
    if index < MOTOR_COUNT {
        Ok(index)
    } else {
        Err(Error::InvalidArgument(format!(
            "Invalid motor identifier: {}, valid values are: 0, 1",
            identifier
        )))
    }
}

#[async_trait]
impl<T: LineTransport> Backend for SrMotorBackend<T> {
    type Board = MotorBoard<Self>;

    async fn firmware_version(&mut self) -> Result<Option<String>> {
        self.query_version().await.map(Some)
    }
}

#[async_trait]
impl<T: LineTransport> MotorInterface for SrMotorBackend<T> {
    fn get_motor_state(&self, identifier: u8) -> Result<MotorState> {
        Ok(self.state[motor_index(identifier)?])
    }

    async fn set_motor_state(&mut self, identifier: u8, state: MotorState) -> Result<()> {
        let index = motor_index(identifier)?;
        let value = encode_state(state)?;
        self.send_command(CMD_MOTOR[index], Some(value)).await?;
        self.state[index] = state;
        Ok(())
    }
}
