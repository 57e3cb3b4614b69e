//! Normalize transport faults into communication errors.
//!
//! Every call into a serial port goes through one of these functions. The
//! original fault message is preserved, and for low-level fault codes with a
//! well-known cause a hint is appended.

use std::{io, time::Duration};
use tokio_util::codec::LinesCodecError;

use crate::error::Error;

const HINT_UNPLUGGED: &str = "is the board plugged in?";
const HINT_UNPOWERED: &str = "is the board correctly powered?";
const HINT_DISCONNECTED: &str = "the device may have been disconnected";
const HINT_PERMISSION: &str = "does this user have permission to open the port?";

// Linux errno values
const EIO: i32 = 5;
const ENXIO: i32 = 6;
const ENODEV: i32 = 19;
const ETIMEDOUT: i32 = 110;

fn with_hint(message: String, hint: Option<&str>) -> Error {
    match hint {
        Some(hint) => Error::Communication(format!("{message}; {hint}")),
        None => Error::Communication(message),
    }
}

fn io_hint(err: &io::Error) -> Option<&'static str> {
    match err.raw_os_error() {
        Some(ETIMEDOUT) => return Some(HINT_UNPOWERED),
        Some(EIO) | Some(ENXIO) | Some(ENODEV) => return Some(HINT_DISCONNECTED),
        _ => {}
    }
    match err.kind() {
        io::ErrorKind::TimedOut => Some(HINT_UNPOWERED),
        io::ErrorKind::NotFound => Some(HINT_UNPLUGGED),
        io::ErrorKind::PermissionDenied => Some(HINT_PERMISSION),
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => Some(HINT_DISCONNECTED),
        _ => None,
    }
}

/// Classify an I/O fault raised while doing `context`.
pub fn classify_io(context: &str, err: io::Error) -> Error {
    let hint = io_hint(&err);
    with_hint(format!("{context}: {err}"), hint)
}

/// Classify a fault raised while opening or configuring a serial port.
pub fn classify_serial(context: &str, err: tokio_serial::Error) -> Error {
    let hint = match err.kind() {
        tokio_serial::ErrorKind::NoDevice => Some(HINT_UNPLUGGED),
        tokio_serial::ErrorKind::Io(kind) => io_hint(&io::Error::from(kind)),
        _ => None,
    };
    with_hint(format!("{context}: {err}"), hint)
}

/// Classify a fault from the line codec.
pub fn classify_codec(context: &str, err: LinesCodecError) -> Error {
    match err {
        LinesCodecError::Io(err) => classify_io(context, err),
        LinesCodecError::MaxLineLengthExceeded => {
            Error::Communication(format!("{context}: line from board too long"))
        }
    }
}

/// No complete line arrived within `timeout`.
pub fn timed_out(context: &str, timeout: Duration) -> Error {
    with_hint(
        format!("{context}: no response from board within {}ms", timeout.as_millis()),
        Some(HINT_UNPOWERED),
    )
}
