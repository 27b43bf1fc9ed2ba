use crate::mapping::{ControlMapping, ControlSample, DutyCycles, LinearMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("{name} mapping is degenerate or non-finite: {map:?}")]
    InvalidMapping { name: &'static str, map: LinearMap },
    #[error("duty cycle {duty} out of range for {channel} (expected 0..=100)")]
    InvalidDuty { channel: String, duty: f64 },
    #[error("{channel}: {source}")]
    Backend {
        channel: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A PWM channel driven by duty-cycle percentage.
pub trait PwmOutput {
    fn set_duty_percent(&mut self, duty: f64) -> Result<(), ActuationError>;
}

/// A plain on/off output pin.
pub trait DigitalOutput {
    fn set_level(&mut self, high: bool) -> Result<(), ActuationError>;
}

/// BCM pin numbers and PWM frequencies for the car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    pub motor_pwm: u8,
    pub motor_direction: u8,
    pub servo: u8,
    pub motor_frequency_hz: f64,
    pub servo_frequency_hz: f64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            motor_pwm: 26,
            motor_direction: 19,
            servo: 24,
            motor_frequency_hz: 100.0,
            servo_frequency_hz: 50.0,
        }
    }
}

pub(crate) fn check_duty(channel: &str, duty: f64) -> Result<(), ActuationError> {
    if duty.is_nan() || !(0.0..=100.0).contains(&duty) {
        return Err(ActuationError::InvalidDuty {
            channel: channel.to_string(),
            duty,
        });
    }
    Ok(())
}

/// Owns the steering servo channel, the drive motor channel and the motor
/// direction pin for as long as it lives.
///
/// Construction puts the hardware in a safe state (both duties 0, direction
/// forward). Dropping the controller stops both channels again; call
/// [`ActuatorController::release`] to observe shutdown errors instead of
/// having them logged.
pub struct ActuatorController<S: PwmOutput, M: PwmOutput, D: DigitalOutput> {
    servo: S,
    motor: M,
    direction: D,
    mapping: ControlMapping,
    last: DutyCycles,
    released: bool,
}

impl<S: PwmOutput, M: PwmOutput, D: DigitalOutput> ActuatorController<S, M, D> {
    pub fn new(
        servo: S,
        motor: M,
        direction: D,
        mapping: ControlMapping,
    ) -> Result<Self, ActuationError> {
        if !mapping.steering.is_valid() {
            return Err(ActuationError::InvalidMapping {
                name: "steering",
                map: mapping.steering,
            });
        }
        if !mapping.throttle.is_valid() {
            return Err(ActuationError::InvalidMapping {
                name: "throttle",
                map: mapping.throttle,
            });
        }
        let mut controller = Self {
            servo,
            motor,
            direction,
            mapping,
            last: DutyCycles::default(),
            released: false,
        };
        controller.direction.set_level(false)?;
        controller.servo.set_duty_percent(0.0)?;
        controller.motor.set_duty_percent(0.0)?;
        Ok(controller)
    }

    pub fn mapping(&self) -> &ControlMapping {
        &self.mapping
    }

    /// Duty cycles most recently written to the channels.
    pub fn last_duties(&self) -> DutyCycles {
        self.last
    }

    pub fn set_steering(&mut self, steering_raw: i32) -> Result<f64, ActuationError> {
        let duty = self.mapping.servo_duty(steering_raw);
        self.servo.set_duty_percent(duty)?;
        self.last.servo = duty;
        Ok(duty)
    }

    pub fn set_throttle(&mut self, throttle_raw: i32) -> Result<f64, ActuationError> {
        let duty = self.mapping.motor_duty(throttle_raw);
        self.motor.set_duty_percent(duty)?;
        self.last.motor = duty;
        Ok(duty)
    }

    pub fn apply(&mut self, sample: ControlSample) -> Result<DutyCycles, ActuationError> {
        self.set_steering(sample.steering)?;
        self.set_throttle(sample.throttle)?;
        Ok(self.last)
    }

    /// Motor off first, then the servo pulse.
    pub fn stop(&mut self) -> Result<(), ActuationError> {
        self.motor.set_duty_percent(0.0)?;
        self.last.motor = 0.0;
        self.servo.set_duty_percent(0.0)?;
        self.last.servo = 0.0;
        Ok(())
    }

    pub fn release(mut self) -> Result<(), ActuationError> {
        self.released = true;
        self.stop()?;
        self.direction.set_level(false)
    }
}

impl<S: PwmOutput, M: PwmOutput, D: DigitalOutput> Drop for ActuatorController<S, M, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.stop() {
            tracing::warn!("failed to stop actuators on drop: {err}");
        }
    }
}
