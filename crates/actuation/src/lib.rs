//! Actuator control for the car: raw joystick axis values in, PWM duty cycles out.
//!
//! - [`mapping`]: the fixed linear range maps (axis value to duty percentage).
//! - [`controller`]: an owned controller over two PWM channels and a direction pin.
//! - [`fake`]: in-memory channels that record every write, for tests and dry runs.
//! - `rpi` (feature `rpi`): software PWM on Raspberry Pi GPIO via `rppal`.

pub mod controller;
pub mod fake;
pub mod mapping;
#[cfg(feature = "rpi")]
pub mod rpi;

pub use controller::{ActuationError, ActuatorController, DigitalOutput, PinConfig, PwmOutput};
pub use fake::{fake_controller, ActuatorWrite, FakePin, FakePwm, FakeController, WriteLog};
pub use mapping::{
    map_range, ControlMapping, ControlSample, DutyCycles, LinearMap, STEERING_MAP, THROTTLE_MAP,
};

pub mod prelude {
    pub use crate::controller::{ActuatorController, DigitalOutput, PwmOutput};
    pub use crate::mapping::{ControlMapping, ControlSample, DutyCycles};
}
