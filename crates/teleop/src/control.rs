use crate::input::{EventKind, InputEvent};
use actuation::ControlSample;
use serde::{Deserialize, Serialize};

/// Which event codes drive which control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCodes {
    /// Absolute axis for steering (`ABS_X`).
    pub steering: u16,
    /// Absolute axis for throttle (`ABS_RZ`).
    pub throttle: u16,
    /// Key whose press flips recording on and off.
    pub record_toggle: Option<u16>,
}

impl Default for AxisCodes {
    fn default() -> Self {
        Self {
            steering: 0,
            throttle: 5,
            record_toggle: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUpdate {
    Steering(i32),
    Throttle(i32),
    ToggleRecording,
    Ignored,
}

/// Latest raw axis values, folded from the event stream.
#[derive(Debug, Clone)]
pub struct ControlState {
    codes: AxisCodes,
    sample: ControlSample,
}

impl ControlState {
    pub fn new(codes: AxisCodes) -> Self {
        Self {
            codes,
            sample: ControlSample::NEUTRAL,
        }
    }

    pub fn codes(&self) -> AxisCodes {
        self.codes
    }

    pub fn sample(&self) -> ControlSample {
        self.sample
    }

    pub fn handle(&mut self, event: &InputEvent) -> ControlUpdate {
        match event.kind {
            EventKind::Absolute if event.code == self.codes.steering => {
                self.sample.steering = event.value;
                ControlUpdate::Steering(event.value)
            }
            EventKind::Absolute if event.code == self.codes.throttle => {
                self.sample.throttle = event.value;
                ControlUpdate::Throttle(event.value)
            }
            // value 1 is press; 0 release and 2 autorepeat are ignored
            EventKind::Key if Some(event.code) == self.codes.record_toggle && event.value == 1 => {
                ControlUpdate::ToggleRecording
            }
            _ => ControlUpdate::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_update_only_their_control() {
        let mut state = ControlState::new(AxisCodes::default());
        assert_eq!(state.sample(), ControlSample::NEUTRAL);
        assert_eq!(
            state.handle(&InputEvent::axis(0, 40)),
            ControlUpdate::Steering(40)
        );
        assert_eq!(
            state.handle(&InputEvent::axis(5, 12)),
            ControlUpdate::Throttle(12)
        );
        assert_eq!(state.handle(&InputEvent::axis(1, 99)), ControlUpdate::Ignored);
        assert_eq!(state.sample(), ControlSample::new(40, 12));
    }

    #[test]
    fn toggle_fires_on_press_only() {
        let mut state = ControlState::new(AxisCodes {
            record_toggle: Some(304),
            ..AxisCodes::default()
        });
        assert_eq!(
            state.handle(&InputEvent::key(304, true)),
            ControlUpdate::ToggleRecording
        );
        assert_eq!(state.handle(&InputEvent::key(304, false)), ControlUpdate::Ignored);
        assert_eq!(state.handle(&InputEvent::key(305, true)), ControlUpdate::Ignored);
    }

    #[test]
    fn key_with_axis_code_is_not_an_axis() {
        let mut state = ControlState::new(AxisCodes::default());
        assert_eq!(state.handle(&InputEvent::key(0, true)), ControlUpdate::Ignored);
        assert_eq!(state.sample(), ControlSample::NEUTRAL);
    }
}
