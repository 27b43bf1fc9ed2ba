//! The teleop loop: input and actuation on the calling thread, frame capture
//! and frame writing on two worker threads joined by a bounded queue.
//!
//! Actuation never waits on the camera or the disk. When the writer falls
//! behind, the capture thread drops frames (counted in the report) instead
//! of blocking.

use crate::control::{ControlState, ControlUpdate};
use crate::input::{EventSource, InputError};
use actuation::{ActuationError, ActuatorController, ControlSample, DigitalOutput, PwmOutput};
use capture_utils::{warm_up, CaptureResult, FrameRecord, FrameSource, Recorder};
use crossbeam_channel::{bounded, tick, Receiver, Sender, TrySendError};
use data_contracts::CaptureMode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TeleopError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Actuation(#[from] ActuationError),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

/// Opens the camera on the capture thread, so the source itself need not be `Send`.
pub type CameraOpener = Box<dyn FnOnce() -> CaptureResult<Box<dyn FrameSource>> + Send>;

/// The recording half of a session: where frames come from and where they go.
pub struct Recording {
    pub camera: CameraOpener,
    pub recorder: Box<dyn Recorder + Send>,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub capture_mode: CaptureMode,
    pub fps: u32,
    pub queue_capacity: usize,
    pub warmup_frames: usize,
    pub max_frames: Option<u64>,
    pub record_at_start: bool,
    /// Longest wait for an input event before re-checking the running flag.
    pub poll_timeout: Duration,
    pub stats_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            capture_mode: CaptureMode::Periodic,
            fps: 20,
            queue_capacity: 32,
            warmup_frames: 60,
            max_frames: None,
            record_at_start: true,
            poll_timeout: Duration::from_millis(100),
            stats_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeleopReport {
    pub events: u64,
    /// Frames grabbed while recording (queued or dropped).
    pub frames_captured: u64,
    pub frames_written: u64,
    pub frames_dropped: u64,
    pub write_errors: u64,
}

#[derive(Default)]
struct Counters {
    captured: AtomicU64,
    /// Frames handed to the writer; `max_frames` limits this count.
    queued: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    write_errors: AtomicU64,
}

struct Shared {
    running: Arc<AtomicBool>,
    /// Cleared for good when the camera fails.
    camera_ok: AtomicBool,
    recording: AtomicBool,
    latest: Mutex<ControlSample>,
    counters: Counters,
}

impl Shared {
    fn latest(&self) -> ControlSample {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, sample: ControlSample) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = sample;
    }

    fn disable_camera(&self) {
        self.camera_ok.store(false, Ordering::SeqCst);
        self.recording.store(false, Ordering::SeqCst);
    }
}

struct Workers {
    capture: JoinHandle<()>,
    writer: JoinHandle<()>,
    trigger: Option<Sender<()>>,
}

/// Run until `running` is cleared (Ctrl-C) or the event source closes.
///
/// Actuators are stopped before returning; the caller still owns the
/// controller and decides whether to `release` it.
pub fn run_teleop<E, S, M, D>(
    events: &mut E,
    controller: &mut ActuatorController<S, M, D>,
    mut controls: ControlState,
    recording: Option<Recording>,
    opts: &RuntimeOptions,
    running: Arc<AtomicBool>,
) -> Result<TeleopReport, TeleopError>
where
    E: EventSource + ?Sized,
    S: PwmOutput,
    M: PwmOutput,
    D: DigitalOutput,
{
    let shared = Arc::new(Shared {
        running,
        camera_ok: AtomicBool::new(recording.is_some()),
        recording: AtomicBool::new(recording.is_some() && opts.record_at_start),
        latest: Mutex::new(controls.sample()),
        counters: Counters::default(),
    });

    let mut workers = match recording {
        Some(rec) => Some(spawn_workers(rec, opts, &shared)?),
        None => {
            tracing::info!("recording disabled; actuation only");
            None
        }
    };

    let mut report = TeleopReport::default();
    let input_result = input_loop(
        events,
        controller,
        &mut controls,
        &shared,
        workers.as_ref().and_then(|w| w.trigger.as_ref()),
        opts,
        &mut report,
    );

    shared.running.store(false, Ordering::SeqCst);
    let stop_result = controller.stop();

    let mut join_result = Ok(());
    if let Some(mut w) = workers.take() {
        // Closing the trigger channel ends a per-event capture thread.
        w.trigger.take();
        if w.capture.join().is_err() {
            join_result = Err(TeleopError::Panicked("capture"));
        }
        if w.writer.join().is_err() {
            join_result = Err(TeleopError::Panicked("writer"));
        }
    }

    let c = &shared.counters;
    report.frames_captured = c.captured.load(Ordering::SeqCst);
    report.frames_written = c.written.load(Ordering::SeqCst);
    report.frames_dropped = c.dropped.load(Ordering::SeqCst);
    report.write_errors = c.write_errors.load(Ordering::SeqCst);
    tracing::info!(
        "teleop stopped: {} events, {} frames written, {} dropped, {} write errors",
        report.events,
        report.frames_written,
        report.frames_dropped,
        report.write_errors
    );

    input_result?;
    stop_result?;
    join_result?;
    Ok(report)
}

fn input_loop<E, S, M, D>(
    events: &mut E,
    controller: &mut ActuatorController<S, M, D>,
    controls: &mut ControlState,
    shared: &Shared,
    trigger: Option<&Sender<()>>,
    opts: &RuntimeOptions,
    report: &mut TeleopReport,
) -> Result<(), TeleopError>
where
    E: EventSource + ?Sized,
    S: PwmOutput,
    M: PwmOutput,
    D: DigitalOutput,
{
    while shared.running.load(Ordering::SeqCst) {
        let event = match events.next_event(opts.poll_timeout) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(InputError::Closed) => {
                tracing::info!("input closed");
                break;
            }
            Err(err) => return Err(err.into()),
        };
        report.events += 1;
        match controls.handle(&event) {
            ControlUpdate::Steering(raw) => {
                let duty = controller.set_steering(raw)?;
                tracing::debug!("steering {raw} -> servo {duty:.2}%");
                shared.publish(controls.sample());
            }
            ControlUpdate::Throttle(raw) => {
                let duty = controller.set_throttle(raw)?;
                tracing::debug!("throttle {raw} -> motor {duty:.2}%");
                shared.publish(controls.sample());
            }
            ControlUpdate::ToggleRecording => {
                if shared.camera_ok.load(Ordering::SeqCst) {
                    let now = !shared.recording.fetch_xor(true, Ordering::SeqCst);
                    tracing::info!("recording {}", if now { "on" } else { "off" });
                } else {
                    tracing::warn!("recording unavailable");
                }
            }
            ControlUpdate::Ignored => {}
        }

        // Per-event capture takes one frame for every event read, mapped or not.
        if let Some(trigger) = trigger {
            if shared.recording.load(Ordering::SeqCst) {
                if let Err(TrySendError::Full(())) = trigger.try_send(()) {
                    shared.counters.captured.fetch_add(1, Ordering::SeqCst);
                    shared.counters.dropped.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
    Ok(())
}

fn spawn_workers(
    rec: Recording,
    opts: &RuntimeOptions,
    shared: &Arc<Shared>,
) -> Result<Workers, TeleopError> {
    let (jobs_tx, jobs_rx) = bounded::<FrameRecord>(opts.queue_capacity.max(1));
    let (trigger_tx, trigger_rx) = match opts.capture_mode {
        CaptureMode::PerEvent => {
            let (tx, rx) = bounded::<()>(opts.queue_capacity.max(1));
            (Some(tx), Some(rx))
        }
        CaptureMode::Periodic => (None, None),
    };

    let writer = {
        let shared = Arc::clone(shared);
        let recorder = rec.recorder;
        let interval = opts.stats_interval;
        thread::Builder::new()
            .name("writer".into())
            .spawn(move || writer_loop(recorder, jobs_rx, &shared, interval))
            .map_err(|source| TeleopError::Spawn {
                name: "writer",
                source,
            })?
    };

    let capture = {
        let shared = Arc::clone(shared);
        let camera = rec.camera;
        let opts = opts.clone();
        thread::Builder::new()
            .name("capture".into())
            .spawn(move || capture_thread(camera, trigger_rx, jobs_tx, &shared, &opts))
            .map_err(|source| TeleopError::Spawn {
                name: "capture",
                source,
            })?
    };

    Ok(Workers {
        capture,
        writer,
        trigger: trigger_tx,
    })
}

fn capture_thread(
    camera: CameraOpener,
    trigger: Option<Receiver<()>>,
    jobs: Sender<FrameRecord>,
    shared: &Shared,
    opts: &RuntimeOptions,
) {
    let mut source = match camera() {
        Ok(source) => source,
        Err(err) => {
            tracing::error!("camera unavailable, recording disabled: {err}");
            shared.disable_camera();
            return;
        }
    };
    if let Err(err) = warm_up(&mut source, opts.warmup_frames) {
        tracing::error!("camera warm-up failed, recording disabled: {err}");
        shared.disable_camera();
        return;
    }
    tracing::info!("capture ready ({:?}, {} fps)", opts.capture_mode, opts.fps);

    match trigger {
        // Runs until the input side drops the trigger sender, so every
        // trigger already queued still produces a frame.
        Some(trigger) => {
            for () in trigger.iter() {
                if !capture_once(&mut source, &jobs, shared, opts) {
                    break;
                }
            }
        }
        None => {
            let ticker = tick(Duration::from_secs_f64(1.0 / opts.fps.max(1) as f64));
            while shared.running.load(Ordering::SeqCst) {
                if ticker.recv().is_err() || !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                if !capture_once(&mut source, &jobs, shared, opts) {
                    break;
                }
            }
        }
    }
}

/// Grab one frame and queue it if recording. Returns `false` when capture should stop.
fn capture_once(
    source: &mut Box<dyn FrameSource>,
    jobs: &Sender<FrameRecord>,
    shared: &Shared,
    opts: &RuntimeOptions,
) -> bool {
    // Frames are read even while not recording so the driver's buffers stay fresh.
    let frame = match source.next_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => return true,
        Err(err) => {
            tracing::error!("camera read failed, recording disabled: {err}");
            shared.disable_camera();
            return false;
        }
    };
    if !shared.recording.load(Ordering::SeqCst) {
        return true;
    }
    let c = &shared.counters;
    let sample = shared.latest();
    let job = FrameRecord {
        frame,
        steering: sample.steering,
        throttle: sample.throttle,
    };
    c.captured.fetch_add(1, Ordering::SeqCst);
    match jobs.try_send(job) {
        Ok(()) => {
            let queued = c.queued.fetch_add(1, Ordering::SeqCst) + 1;
            if opts.max_frames.is_some_and(|max| queued >= max) {
                tracing::info!("reached max_frames ({queued}); recording off");
                shared.recording.store(false, Ordering::SeqCst);
            }
            true
        }
        // Dropped frames never reach the run, so they do not count toward max_frames.
        Err(TrySendError::Full(_)) => {
            c.dropped.fetch_add(1, Ordering::SeqCst);
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn writer_loop(
    mut recorder: Box<dyn Recorder + Send>,
    jobs: Receiver<FrameRecord>,
    shared: &Shared,
    stats_interval: Duration,
) {
    let started = Instant::now();
    let mut last_report = started;
    let c = &shared.counters;
    // Ends once the capture thread exits and the queue is drained.
    for job in jobs.iter() {
        match recorder.record(&job) {
            Ok(_) => {
                c.written.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                c.write_errors.fetch_add(1, Ordering::SeqCst);
                tracing::error!("failed to write frame {}: {err}", job.frame.id);
            }
        }
        if last_report.elapsed() >= stats_interval {
            last_report = Instant::now();
            let written = c.written.load(Ordering::SeqCst);
            tracing::info!(
                "frames written {}, dropped {}, avg {:.1} fps",
                written,
                c.dropped.load(Ordering::SeqCst),
                written as f64 / started.elapsed().as_secs_f64().max(1e-9)
            );
        }
    }
}
