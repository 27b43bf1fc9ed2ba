//! Raspberry Pi backend: software PWM on BCM GPIO pins through `rppal`.
//!
//! Servo pulses at 50 Hz: 7.7..11.7 % duty is roughly 1.5..2.3 ms.

use crate::controller::{
    check_duty, ActuationError, ActuatorController, DigitalOutput, PinConfig, PwmOutput,
};
use crate::mapping::ControlMapping;
use rppal::gpio::{Gpio, OutputPin};

pub type RpiController = ActuatorController<SoftPwm, SoftPwm, GpioPin>;

fn gpio_error(channel: &str, pin: u8, err: rppal::gpio::Error) -> ActuationError {
    ActuationError::Backend {
        channel: format!("{channel} (BCM {pin})"),
        source: Box::new(err),
    }
}

pub struct SoftPwm {
    name: &'static str,
    bcm: u8,
    pin: OutputPin,
    frequency_hz: f64,
}

impl SoftPwm {
    pub fn open(
        gpio: &Gpio,
        name: &'static str,
        bcm: u8,
        frequency_hz: f64,
    ) -> Result<Self, ActuationError> {
        let pin = gpio
            .get(bcm)
            .map_err(|e| gpio_error(name, bcm, e))?
            .into_output_low();
        Ok(Self {
            name,
            bcm,
            pin,
            frequency_hz,
        })
    }
}

impl PwmOutput for SoftPwm {
    fn set_duty_percent(&mut self, duty: f64) -> Result<(), ActuationError> {
        check_duty(self.name, duty)?;
        self.pin
            .set_pwm_frequency(self.frequency_hz, duty / 100.0)
            .map_err(|e| gpio_error(self.name, self.bcm, e))
    }
}

impl Drop for SoftPwm {
    fn drop(&mut self) {
        if let Err(err) = self.pin.clear_pwm() {
            tracing::warn!("failed to clear PWM on BCM {}: {err}", self.bcm);
        }
    }
}

pub struct GpioPin {
    pin: OutputPin,
}

impl GpioPin {
    pub fn open(gpio: &Gpio, name: &'static str, bcm: u8) -> Result<Self, ActuationError> {
        let pin = gpio
            .get(bcm)
            .map_err(|e| gpio_error(name, bcm, e))?
            .into_output_low();
        Ok(Self { pin })
    }
}

impl DigitalOutput for GpioPin {
    fn set_level(&mut self, high: bool) -> Result<(), ActuationError> {
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

/// Claim the three pins. They return to their previous mode when the
/// controller (and with it each `OutputPin`) is dropped.
pub fn open_rpi_controller(
    pins: &PinConfig,
    mapping: ControlMapping,
) -> Result<RpiController, ActuationError> {
    let gpio = Gpio::new().map_err(|e| ActuationError::Backend {
        channel: "gpio".to_string(),
        source: Box::new(e),
    })?;
    let servo = SoftPwm::open(&gpio, "servo", pins.servo, pins.servo_frequency_hz)?;
    let motor = SoftPwm::open(&gpio, "motor", pins.motor_pwm, pins.motor_frequency_hz)?;
    let direction = GpioPin::open(&gpio, "direction", pins.motor_direction)?;
    tracing::info!(
        "GPIO ready: servo BCM {} @ {} Hz, motor BCM {} @ {} Hz, direction BCM {}",
        pins.servo,
        pins.servo_frequency_hz,
        pins.motor_pwm,
        pins.motor_frequency_hz,
        pins.motor_direction
    );
    ActuatorController::new(servo, motor, direction, mapping)
}
