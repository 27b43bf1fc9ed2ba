//! In-memory actuator channels. Every write lands in a shared [`WriteLog`].

use crate::controller::{check_duty, ActuationError, ActuatorController, DigitalOutput, PwmOutput};
use crate::mapping::ControlMapping;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorWrite {
    Duty { channel: &'static str, duty: f64 },
    Level { channel: &'static str, high: bool },
}

pub type WriteLog = Arc<Mutex<Vec<ActuatorWrite>>>;

pub type FakeController = ActuatorController<FakePwm, FakePwm, FakePin>;

fn push(log: &WriteLog, write: ActuatorWrite) {
    log.lock().unwrap_or_else(|e| e.into_inner()).push(write);
}

#[derive(Debug, Clone)]
pub struct FakePwm {
    name: &'static str,
    log: WriteLog,
    fail: bool,
}

impl FakePwm {
    pub fn new(name: &'static str, log: WriteLog) -> Self {
        Self {
            name,
            log,
            fail: false,
        }
    }

    /// A channel whose every write fails, as a disconnected driver would.
    pub fn failing(name: &'static str, log: WriteLog) -> Self {
        Self {
            name,
            log,
            fail: true,
        }
    }
}

impl PwmOutput for FakePwm {
    fn set_duty_percent(&mut self, duty: f64) -> Result<(), ActuationError> {
        check_duty(self.name, duty)?;
        if self.fail {
            return Err(ActuationError::Backend {
                channel: self.name.to_string(),
                source: "channel unavailable".into(),
            });
        }
        push(
            &self.log,
            ActuatorWrite::Duty {
                channel: self.name,
                duty,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakePin {
    name: &'static str,
    log: WriteLog,
}

impl FakePin {
    pub fn new(name: &'static str, log: WriteLog) -> Self {
        Self { name, log }
    }
}

impl DigitalOutput for FakePin {
    fn set_level(&mut self, high: bool) -> Result<(), ActuationError> {
        push(
            &self.log,
            ActuatorWrite::Level {
                channel: self.name,
                high,
            },
        );
        Ok(())
    }
}

/// Controller over fake `servo`, `motor` and `direction` channels sharing one log.
pub fn fake_controller(
    mapping: ControlMapping,
) -> Result<(FakeController, WriteLog), ActuationError> {
    let log = WriteLog::default();
    let controller = ActuatorController::new(
        FakePwm::new("servo", log.clone()),
        FakePwm::new("motor", log.clone()),
        FakePin::new("direction", log.clone()),
        mapping,
    )?;
    Ok((controller, log))
}
