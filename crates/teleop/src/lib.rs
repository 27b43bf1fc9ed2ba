//! Teleoperation for the car: gamepad events drive the actuators while a
//! capture thread logs camera frames labeled with the current controls.
//!
//! - [`input`]: the event-source seam, scripted events, and (feature `evdev`)
//!   the Linux gamepad reader.
//! - [`control`]: folds events into the latest steering/throttle sample.
//! - [`config`]: `bearcart.toml` loading.
//! - [`runtime`]: the three-thread input/capture/writer loop.

pub mod config;
pub mod control;
#[cfg(feature = "evdev")]
pub mod evdev_source;
pub mod input;
pub mod runtime;

pub use config::{CameraConfig, CaptureConfig, ConfigError, TeleopConfig};
pub use control::{AxisCodes, ControlState, ControlUpdate};
#[cfg(feature = "evdev")]
pub use evdev_source::EvdevSource;
pub use input::{EventKind, EventSource, InputError, InputEvent, ScriptedEvents};
pub use runtime::{
    run_teleop, CameraOpener, Recording, RuntimeOptions, TeleopError, TeleopReport,
};

