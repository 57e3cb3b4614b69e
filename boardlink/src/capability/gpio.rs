//! GPIO pin capability.

use async_trait::async_trait;
use strum::{Display, EnumIter};

use crate::error::{Error, Result};

/// Pin identifier on a board.
pub type PinId = u8;

/// Electrical role a GPIO pin can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PinMode {
    /// The digital state of the pin can be read
    DigitalInput,
    /// Same as DigitalInput but internal pull-up is enabled
    DigitalInputPullup,
    /// Same as DigitalInput but internal pull-down is enabled
    DigitalInputPulldown,
    /// The digital state of the pin can be set
    DigitalOutput,
    /// The analogue voltage of the pin can be read
    AnalogueInput,
    /// The analogue voltage of the pin can be set using a DAC
    AnalogueOutput,
    /// A PWM output signal can be created on the pin
    PwmOutput,
}

impl PinMode {
    pub fn is_digital_input(self) -> bool {
        matches!(
            self,
            PinMode::DigitalInput | PinMode::DigitalInputPullup | PinMode::DigitalInputPulldown
        )
    }
}

/// Operations a backend must provide to drive GPIO pins.
///
/// `get_*` operations answer from the backend's local view and never touch
/// the transport; `read_*` and `write_*` operations always do a round trip.
#[async_trait]
pub trait GpioPinInterface: Send {
    /// Set the hardware mode of a GPIO pin.
    async fn set_gpio_pin_mode(&mut self, identifier: PinId, mode: PinMode) -> Result<()>;

    /// Get the hardware mode of a GPIO pin.
    fn get_gpio_pin_mode(&self, identifier: PinId) -> Result<PinMode>;

    /// Write to the digital state of a GPIO pin.
    async fn write_gpio_pin_digital_state(&mut self, identifier: PinId, state: bool)
        -> Result<()>;

    /// Get the last written state of the GPIO pin.
    fn get_gpio_pin_digital_state(&self, identifier: PinId) -> Result<bool>;

    /// Read the digital state of the GPIO pin.
    async fn read_gpio_pin_digital_state(&mut self, identifier: PinId) -> Result<bool>;

    /// Read the analogue voltage of the GPIO pin.
    async fn read_gpio_pin_analogue_value(&mut self, identifier: PinId) -> Result<f32>;

    /// Write a scaled value (0 to 1) to the DAC on the GPIO pin.
    async fn write_gpio_pin_dac_value(&mut self, identifier: PinId, scaled_value: f32)
        -> Result<()>;

    /// Write a duty cycle (0 to 1) to the PWM on the GPIO pin.
    async fn write_gpio_pin_pwm_value(&mut self, identifier: PinId, duty_cycle: f32)
        -> Result<()>;
}

/// A GPIO pin on a board.
///
/// The handle borrows the board's backend and checks the pin is in a suitable
/// mode before delegating each operation.
pub struct GpioPin<'a, B: ?Sized> {
    identifier: PinId,
    backend: &'a mut B,
    hardware_modes: &'static [PinMode],
}

impl<'a, B: GpioPinInterface + ?Sized> GpioPin<'a, B> {
    pub fn new(
        identifier: PinId,
        backend: &'a mut B,
        hardware_modes: &'static [PinMode],
    ) -> Result<Self> {
        if hardware_modes.is_empty() {
            return Err(Error::InvalidArgument(
                "a GPIO pin must support at least one hardware mode".into(),
            ));
        }
        Ok(Self {
            identifier,
            backend,
            hardware_modes,
        })
    }

    pub fn identifier(&self) -> PinId {
        self.identifier
    }

    /// Modes this pin's hardware can be put into.
    pub fn hardware_modes(&self) -> &'static [PinMode] {
        self.hardware_modes
    }

    pub fn mode(&self) -> Result<PinMode> {
        self.backend.get_gpio_pin_mode(self.identifier)
    }

    pub async fn set_mode(&mut self, mode: PinMode) -> Result<()> {
        if !self.hardware_modes.contains(&mode) {
            return Err(Error::NotSupportedByHardware(format!(
                "pin {} does not support {}",
                self.identifier, mode
            )));
        }
        self.backend.set_gpio_pin_mode(self.identifier, mode).await
    }

    fn require_modes(&self, modes: &[PinMode]) -> Result<PinMode> {
        let mode = self.mode()?;
        if modes.contains(&mode) {
            Ok(mode)
        } else {
            let wanted: Vec<String> = modes.iter().map(ToString::to_string).collect();
            Err(Error::PreconditionViolation(format!(
                "pin {} needs to be in one of [{}], but is {}",
                self.identifier,
                wanted.join(", "),
                mode
            )))
        }
    }

    /// Digital state of the pin.
    ///
    /// Outputs report the last written value without touching the wire;
    /// inputs are read from the board.
    pub async fn digital_state(&mut self) -> Result<bool> {
        let mode = self.require_modes(&[
            PinMode::DigitalOutput,
            PinMode::DigitalInput,
            PinMode::DigitalInputPullup,
            PinMode::DigitalInputPulldown,
        ])?;
        if mode == PinMode::DigitalOutput {
            self.backend.get_gpio_pin_digital_state(self.identifier)
        } else {
            self.backend.read_gpio_pin_digital_state(self.identifier).await
        }
    }

    pub async fn set_digital_state(&mut self, state: bool) -> Result<()> {
        self.require_modes(&[PinMode::DigitalOutput])?;
        self.backend
            .write_gpio_pin_digital_state(self.identifier, state)
            .await
    }

    /// Analogue voltage at the pin.
    pub async fn analogue_value(&mut self) -> Result<f32> {
        self.require_modes(&[PinMode::AnalogueInput])?;
        self.backend.read_gpio_pin_analogue_value(self.identifier).await
    }

    /// Set a scaled analogue output (0 to 1) via DAC or PWM, depending on the
    /// pin's mode.
    pub async fn set_analogue_value(&mut self, value: f32) -> Result<()> {
        let mode = self.require_modes(&[PinMode::AnalogueOutput, PinMode::PwmOutput])?;
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::InvalidArgument(
                "an analogue pin value must be between 0 and 1".into(),
            ));
        }
        if mode == PinMode::AnalogueOutput {
            self.backend
                .write_gpio_pin_dac_value(self.identifier, value)
                .await
        } else {
            self.backend
                .write_gpio_pin_pwm_value(self.identifier, value)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ALL_MODES: &[PinMode] = &[
        PinMode::DigitalInput,
        PinMode::DigitalInputPullup,
        PinMode::DigitalInputPulldown,
        PinMode::DigitalOutput,
        PinMode::AnalogueInput,
        PinMode::AnalogueOutput,
        PinMode::PwmOutput,
    ];

    /// Records which backend operation each handle call lands on.
    #[derive(Default)]
    struct FakePins {
        modes: HashMap<PinId, PinMode>,
        states: HashMap<PinId, bool>,
        calls: Vec<&'static str>,
    }

    #[async_trait]
    impl GpioPinInterface for FakePins {
        async fn set_gpio_pin_mode(&mut self, identifier: PinId, mode: PinMode) -> Result<()> {
            self.calls.push("set_mode");
            self.modes.insert(identifier, mode);
            Ok(())
        }

        fn get_gpio_pin_mode(&self, identifier: PinId) -> Result<PinMode> {
            Ok(*self.modes.get(&identifier).unwrap_or(&PinMode::DigitalInput))
        }

        async fn write_gpio_pin_digital_state(
            &mut self,
            identifier: PinId,
            state: bool,
        ) -> Result<()> {
            self.calls.push("write_digital");
            self.states.insert(identifier, state);
            Ok(())
        }

        fn get_gpio_pin_digital_state(&self, identifier: PinId) -> Result<bool> {
            Ok(*self.states.get(&identifier).unwrap_or(&false))
        }

        async fn read_gpio_pin_digital_state(&mut self, _identifier: PinId) -> Result<bool> {
            self.calls.push("read_digital");
            Ok(true)
        }

        async fn read_gpio_pin_analogue_value(&mut self, _identifier: PinId) -> Result<f32> {
            self.calls.push("read_analogue");
            Ok(2.5)
        }

        async fn write_gpio_pin_dac_value(&mut self, _identifier: PinId, _value: f32) -> Result<()> {
            self.calls.push("dac");
            Ok(())
        }

        async fn write_gpio_pin_pwm_value(&mut self, _identifier: PinId, _value: f32) -> Result<()> {
            self.calls.push("pwm");
            Ok(())
        }
    }

    #[test]
    fn requires_a_hardware_mode() {
        let mut backend = FakePins::default();
        assert!(matches!(
            GpioPin::new(2, &mut backend, &[]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn rejects_mode_outside_hardware_modes() {
        let mut backend = FakePins::default();
        let mut pin = GpioPin::new(2, &mut backend, &[PinMode::DigitalInput]).unwrap();
        let err = pin.set_mode(PinMode::PwmOutput).await.unwrap_err();
        assert!(matches!(err, Error::NotSupportedByHardware(_)));
        assert!(backend.calls.is_empty());
    }

    #[tokio::test]
    async fn output_state_is_local_input_state_is_read() {
        let mut backend = FakePins::default();
        let mut pin = GpioPin::new(2, &mut backend, ALL_MODES).unwrap();

        pin.set_mode(PinMode::DigitalOutput).await.unwrap();
        pin.set_digital_state(true).await.unwrap();
        assert!(pin.digital_state().await.unwrap());

        pin.set_mode(PinMode::DigitalInputPullup).await.unwrap();
        assert!(pin.digital_state().await.unwrap());

        assert_eq!(
            backend.calls,
            ["set_mode", "write_digital", "set_mode", "read_digital"]
        );
    }

    #[tokio::test]
    async fn writing_an_input_is_a_precondition_violation() {
        let mut backend = FakePins::default();
        let mut pin = GpioPin::new(2, &mut backend, ALL_MODES).unwrap();
        let err = pin.set_digital_state(true).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionViolation(_)));
        assert!(backend.calls.is_empty());
    }

    #[tokio::test]
    async fn analogue_output_dispatches_on_mode() {
        let mut backend = FakePins::default();
        let mut pin = GpioPin::new(9, &mut backend, ALL_MODES).unwrap();

        pin.set_mode(PinMode::AnalogueOutput).await.unwrap();
        pin.set_analogue_value(0.5).await.unwrap();
        pin.set_mode(PinMode::PwmOutput).await.unwrap();
        pin.set_analogue_value(1.0).await.unwrap();
        assert!(matches!(
            pin.set_analogue_value(1.5).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            pin.analogue_value().await,
            Err(Error::PreconditionViolation(_))
        ));

        assert_eq!(backend.calls, ["set_mode", "dac", "set_mode", "pwm"]);
    }

    #[test]
    fn mode_display() {
        assert_eq!(PinMode::DigitalInputPullup.to_string(), "DIGITAL_INPUT_PULLUP");
        assert_eq!(PinMode::PwmOutput.to_string(), "PWM_OUTPUT");
    }
}
