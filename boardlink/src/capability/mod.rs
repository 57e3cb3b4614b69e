//! Capability interfaces.
//!
//! A capability is a named set of operations a hardware feature needs from
//! whichever backend drives it. Each capability has:
//!
//! - an async trait listing the operations (e.g. [`GpioPinInterface`]),
//! - a zero-sized kind marker in [`kind`] that boards list as a supported
//!   component and that [`crate::contract`] checks backends against,
//! - a component handle (e.g. [`GpioPin`]) that client code uses, which
//!   carries an identifier and delegates to the backend.

pub mod gpio;
pub mod led;
pub mod motor;
pub mod ultrasound;

use strum::{Display, EnumIter};

pub use gpio::{GpioPin, GpioPinInterface, PinId, PinMode};
pub use led::{Led, LedInterface};
pub use motor::{Motor, MotorInterface, MotorState};
pub use ultrasound::{UltrasoundInterface, UltrasoundSensor};

/// Runtime name of a capability interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Capability {
    #[strum(to_string = "GPIO pin")]
    GpioPin,
    #[strum(to_string = "LED")]
    Led,
    #[strum(to_string = "ultrasound sensor")]
    Ultrasound,
    #[strum(to_string = "motor")]
    Motor,
}

impl Capability {
    /// Operations a backend must provide to serve this capability.
    pub fn operations(self) -> &'static [&'static str] {
        match self {
            Capability::GpioPin => &[
                "set_gpio_pin_mode",
                "get_gpio_pin_mode",
                "write_gpio_pin_digital_state",
                "get_gpio_pin_digital_state",
                "read_gpio_pin_digital_state",
                "read_gpio_pin_analogue_value",
                "write_gpio_pin_dac_value",
                "write_gpio_pin_pwm_value",
            ],
            Capability::Led => &["get_led_state", "set_led_state"],
            Capability::Ultrasound => &["get_ultrasound_pulse", "get_ultrasound_distance"],
            Capability::Motor => &["get_motor_state", "set_motor_state"],
        }
    }
}

/// A component type a board can advertise.
pub trait ComponentKind: 'static {
    const CAPABILITY: Capability;
}

/// Kind markers, one per capability.
pub mod kind {
    use super::{Capability, ComponentKind};

    pub struct GpioPin;
    pub struct Led;
    pub struct Ultrasound;
    pub struct Motor;

    impl ComponentKind for GpioPin {
        const CAPABILITY: Capability = Capability::GpioPin;
    }

    impl ComponentKind for Led {
        const CAPABILITY: Capability = Capability::Led;
    }

    impl ComponentKind for Ultrasound {
        const CAPABILITY: Capability = Capability::Ultrasound;
    }

    impl ComponentKind for Motor {
        const CAPABILITY: Capability = Capability::Motor;
    }
}
