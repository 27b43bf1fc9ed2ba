//! Gamepad input from a Linux event device.

use crate::input::{EventKind, EventSource, InputError, InputEvent};
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct EvdevSource {
    path: PathBuf,
    device: evdev::Device,
    pending: VecDeque<InputEvent>,
}

impl EvdevSource {
    /// Open the device in non-blocking mode; reads wait through `poll(2)` instead.
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let open_err = |source| InputError::Open {
            path: path.to_path_buf(),
            source,
        };
        let device = evdev::Device::open(path).map_err(open_err)?;
        set_nonblocking(device.as_raw_fd()).map_err(open_err)?;
        tracing::info!(
            "input device {}: {}",
            path.display(),
            device.name().unwrap_or("unnamed")
        );
        Ok(Self {
            path: path.to_path_buf(),
            device,
            pending: VecDeque::new(),
        })
    }

    fn read_err(&self, source: io::Error) -> InputError {
        InputError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            ));
        }
        Ok(rc > 0)
    }
}

fn set_nonblocking(fd: libc::c_int) -> io::Result<()> {
    // SAFETY: fcntl on an fd we own; no pointers involved.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl EventSource for EvdevSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        if !self.wait_readable(timeout).map_err(|e| self.read_err(e))? {
            return Ok(None);
        }
        match self.device.fetch_events() {
            Ok(events) => {
                self.pending.extend(events.map(|ev| InputEvent {
                    kind: EventKind::from_raw(ev.event_type().0),
                    code: ev.code(),
                    value: ev.value(),
                }));
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => return Err(self.read_err(err)),
        }
        Ok(self.pending.pop_front())
    }
}
