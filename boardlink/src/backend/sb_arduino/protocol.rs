//! Wire format of the SourceBots Arduino GPIO firmware.
//!
//! Commands are single ASCII lines:
//!
//! ```text
//! W <pin> <Z|P|H|L>   set pin drive (tri-state, pull-up, high, low)
//! R <pin>             read digital input
//! A                   read every analogue channel
//! T <trigger> <echo>  ultrasound pulse width in microseconds
//! U <trigger> <echo>  ultrasound distance in millimetres
//! ```
//!
//! A reply is any number of lines, terminated by a status line:
//!
//! ```text
//! > <payload>    result data
//! # <text>       firmware comment, ignored
//! + OK           success, end of reply
//! - <reason>     failure, end of reply
//! ```

use regex::Regex;
use std::{fmt, sync::OnceLock};

use crate::{
    capability::{PinId, PinMode},
    error::{Error, Result},
};

/// ADC full scale, in counts.
pub const ADC_COUNTS: f32 = 1024.0;

/// ADC reference voltage.
pub const ANALOGUE_REFERENCE_VOLTAGE: f32 = 5.0;

/// Oldest firmware this driver speaks to.
pub const MIN_FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion {
    major: 2019,
    minor: 6,
    patch: 0,
};

/// Electrical drive a `W` command puts a pin into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDrive {
    Tristate,
    PullUp,
    High,
    Low,
}

impl PinDrive {
    pub fn token(self) -> char {
        match self {
            PinDrive::Tristate => 'Z',
            PinDrive::PullUp => 'P',
            PinDrive::High => 'H',
            PinDrive::Low => 'L',
        }
    }

    /// Drive for entering `mode`, where `output_state` is the level an
    /// output should come up at. `None` if the mode needs no `W` command or
    /// has no drive on this firmware.
    pub fn for_mode(mode: PinMode, output_state: bool) -> Option<Self> {
        match mode {
            PinMode::DigitalInput => Some(PinDrive::Tristate),
            PinMode::DigitalInputPullup => Some(PinDrive::PullUp),
            PinMode::DigitalOutput => Some(Self::for_level(output_state)),
            PinMode::DigitalInputPulldown
            | PinMode::AnalogueInput
            | PinMode::AnalogueOutput
            | PinMode::PwmOutput => None,
        }
    }

    pub fn for_level(high: bool) -> Self {
        if high {
            PinDrive::High
        } else {
            PinDrive::Low
        }
    }
}

/// A command line sent to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Write { pin: PinId, drive: PinDrive },
    Read { pin: PinId },
    ReadAnalogue,
    UltrasoundPulse { trigger: PinId, echo: PinId },
    UltrasoundDistance { trigger: PinId, echo: PinId },
}

/// Encodes the command without its trailing newline.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Write { pin, drive } => write!(f, "W {} {}", pin, drive.token()),
            Command::Read { pin } => write!(f, "R {}", pin),
            Command::ReadAnalogue => write!(f, "A"),
            Command::UltrasoundPulse { trigger, echo } => write!(f, "T {} {}", trigger, echo),
            Command::UltrasoundDistance { trigger, echo } => {
                write!(f, "U {} {}", trigger, echo)
            }
        }
    }
}

/// One line of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine {
    Data(String),
    Comment(String),
    Ok,
    Failure(String),
}

impl ReplyLine {
    pub fn parse(line: &str) -> Result<Self> {
        let code = line.chars().next();
        // Everything after the code character and its separating space.
        let param = line.get(2..).unwrap_or("").to_string();
        match code {
            Some('>') => Ok(ReplyLine::Data(param)),
            Some('#') => Ok(ReplyLine::Comment(param)),
            Some('+') => Ok(ReplyLine::Ok),
            Some('-') => Ok(ReplyLine::Failure(param)),
            _ => Err(Error::Communication(format!(
                "Arduino returned unrecognised response line: {:?}",
                line
            ))),
        }
    }
}

/// Parse the payload of an `R` reply.
pub fn parse_digital(payload: &str) -> Result<bool> {
    match payload {
        "H" => Ok(true),
        "L" => Ok(false),
        _ => Err(Error::Communication(format!(
            "Arduino returned invalid digital state: {:?}",
            payload
        ))),
    }
}

/// Parse one `a<channel> <count>` line of an `A` reply.
pub fn parse_analogue(payload: &str) -> Result<(u8, u16)> {
    let invalid = || {
        Error::Communication(format!(
            "Arduino returned invalid analogue reading: {:?}",
            payload
        ))
    };
    let (name, count) = payload.split_once(' ').ok_or_else(invalid)?;
    let channel = name
        .strip_prefix('a')
        .and_then(|c| c.parse().ok())
        .ok_or_else(invalid)?;
    let count = count.parse().map_err(|_| invalid())?;
    Ok((channel, count))
}

/// Convert a raw ADC count into volts.
pub fn raw_to_voltage(raw: u16) -> f32 {
    (raw as f32 / ADC_COUNTS) * ANALOGUE_REFERENCE_VOLTAGE
}

/// Parse the numeric payload of a `T` or `U` reply.
pub fn parse_count(payload: &str) -> Result<u32> {
    payload.trim().parse().map_err(|_| {
        Error::Communication(format!(
            "Arduino returned invalid measurement: {:?}",
            payload
        ))
    })
}

/// Firmware version, ordered component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    /// Extract the version from an identification line such as
    /// `# SBDuino GPIO v2019.6.0`.
    pub fn from_identification(line: &str) -> Result<Self> {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        let re = VERSION
            .get_or_init(|| Regex::new(r"v(\d+)\.(\d+)\.(\d+)").expect("valid version regex"));

        let invalid = || {
            Error::Communication(format!(
                "Arduino sent unrecognised firmware identification: {:?}",
                line
            ))
        };
        let caps = re.captures(line).ok_or_else(invalid)?;
        let part = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());
        Ok(Self {
            major: part(1)?,
            minor: part(2)?,
            patch: part(3)?,
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
