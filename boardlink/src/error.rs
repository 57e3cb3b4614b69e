//! Common error types for boardlink.
//!
//! This module provides a centralized Error enum using thiserror. Local
//! precondition errors (`NotSupportedByHardware`, `PreconditionViolation`,
//! `InvalidArgument`) are always raised before any bytes reach a transport;
//! everything that went wrong on the wire is folded into `Communication`.

use thiserror::Error;

use crate::capability::Capability;

/// Main error type for boardlink operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A backend was registered for a board whose components it cannot serve.
    ///
    /// This is raised while verifying the backend registry at startup and is
    /// never retryable.
    #[error(
        "Backend {backend} cannot serve board {board}: missing {}",
        describe_missing(.missing)
    )]
    ContractViolation {
        backend: &'static str,
        board: &'static str,
        missing: Vec<Capability>,
    },

    /// The addressed pin or component cannot do this at all.
    #[error("Not supported by hardware: {0}")]
    NotSupportedByHardware(String),

    /// The addressed pin is in a mode incompatible with the operation.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Argument outside the range the component accepts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport fault, firmware failure, malformed reply or unsupported
    /// firmware.
    #[error("Communication error: {0}")]
    Communication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

fn describe_missing(missing: &[Capability]) -> String {
    missing
        .iter()
        .map(|cap| format!("{} ({})", cap, cap.operations().join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// True for errors raised locally, before any transport interaction.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::NotSupportedByHardware(_)
                | Error::PreconditionViolation(_)
                | Error::InvalidArgument(_)
        )
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
