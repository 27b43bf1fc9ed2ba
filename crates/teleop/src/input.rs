use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Linux input event type numbers (`EV_KEY`, `EV_ABS`).
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Absolute,
    Key,
    /// Any other event type (sync, misc, relative...), by raw type number.
    Other(u16),
}

impl EventKind {
    pub fn from_raw(event_type: u16) -> Self {
        match event_type {
            EV_ABS => EventKind::Absolute,
            EV_KEY => EventKind::Key,
            other => EventKind::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const fn axis(code: u16, value: i32) -> Self {
        Self {
            kind: EventKind::Absolute,
            code,
            value,
        }
    }

    pub const fn key(code: u16, pressed: bool) -> Self {
        Self {
            kind: EventKind::Key,
            code,
            value: pressed as i32,
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("input device {path} read failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source has no more events (end of a script).
    #[error("input source closed")]
    Closed,
    #[error("input support not compiled in (enable the `evdev` feature)")]
    Unsupported,
}

/// Blocking-with-timeout event stream.
///
/// `Ok(None)` means the timeout elapsed without an event, so callers can
/// check for shutdown between reads.
pub trait EventSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError>;
}

impl<T: EventSource + ?Sized> EventSource for Box<T> {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        (**self).next_event(timeout)
    }
}

/// Replays a fixed list of events, then reports [`InputError::Closed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    events: VecDeque<InputEvent>,
    interval: Duration,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            interval: Duration::ZERO,
        }
    }

    /// Wait this long before each event (capped by the read timeout).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Steering swept left to right and back while throttle ramps up and down.
    pub fn sweep(steering_code: u16, throttle_code: u16, steps: usize) -> Self {
        let steps = steps.max(2);
        let mut events = Vec::with_capacity(steps * 2);
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            let tri = 1.0 - (2.0 * t - 1.0).abs();
            events.push(InputEvent::axis(steering_code, (t * 255.0).round() as i32));
            events.push(InputEvent::axis(
                throttle_code,
                (128.0 - tri * 64.0).round() as i32,
            ));
        }
        events.push(InputEvent::axis(throttle_code, 128));
        Self::new(events)
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptedEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        if self.events.is_empty() {
            return Err(InputError::Closed);
        }
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval.min(timeout));
        }
        Ok(self.events.pop_front())
    }
}
