//! Motor capability.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// Requested state of a motor output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorState {
    /// Drive power from -1 (full reverse) to 1 (full forward)
    Power(f32),
    /// Let the motor spin freely
    Coast,
    /// Short the motor terminals so it stops quickly
    Brake,
}

impl fmt::Display for MotorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorState::Power(power) => write!(f, "power {:.2}", power),
            MotorState::Coast => write!(f, "coast"),
            MotorState::Brake => write!(f, "brake"),
        }
    }
}

/// Operations a backend must provide to drive motors.
#[async_trait]
pub trait MotorInterface: Send {
    /// Get the last state the motor was set to.
    fn get_motor_state(&self, identifier: u8) -> Result<MotorState>;

    /// Set the state of a motor.
    async fn set_motor_state(&mut self, identifier: u8, state: MotorState) -> Result<()>;
}

/// A motor output on a board.
pub struct Motor<'a, B: ?Sized> {
    identifier: u8,
    backend: &'a mut B,
}

impl<'a, B: MotorInterface + ?Sized> Motor<'a, B> {
    pub fn new(identifier: u8, backend: &'a mut B) -> Self {
        Self {
            identifier,
            backend,
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn state(&self) -> Result<MotorState> {
        self.backend.get_motor_state(self.identifier)
    }

    pub async fn set_state(&mut self, state: MotorState) -> Result<()> {
        self.backend.set_motor_state(self.identifier, state).await
    }

    /// Convenience for `set_state(MotorState::Power(power))`.
    pub async fn set_power(&mut self, power: f32) -> Result<()> {
        self.set_state(MotorState::Power(power)).await
    }
}
