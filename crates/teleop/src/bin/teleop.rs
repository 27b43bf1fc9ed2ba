use actuation::fake_controller;
use anyhow::{Context, Result};
use capture_utils::{
    default_run_name, CaptureResult, CsvRecorder, FrameSource, RunSession, SyntheticSource,
};
use clap::{Parser, ValueEnum};
use data_contracts::{CaptureMode, RunManifest, RunManifestSchemaVersion};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use teleop::{
    run_teleop, CameraOpener, ControlState, Recording, RuntimeOptions, ScriptedEvents,
    TeleopConfig, TeleopReport,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Periodic,
    PerEvent,
}

impl From<ModeArg> for CaptureMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Periodic => CaptureMode::Periodic,
            ModeArg::PerEvent => CaptureMode::PerEvent,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Drive the car from a gamepad and log labeled camera frames"
)]
struct Args {
    /// Config file (default: $BEARCART_CONFIG, then ./bearcart.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run directory name under the data root (default: YYYY_MM_DD_HH_MM).
    #[arg(long)]
    run: Option<String>,
    /// Override the data root from the config.
    #[arg(long)]
    data_root: Option<PathBuf>,
    /// Fake actuators, synthetic frames and a scripted stick sweep instead of hardware.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Drive only; do not open the camera or write frames.
    #[arg(long, default_value_t = false)]
    no_record: bool,
    /// Stop recording after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Capture clock: fixed rate or one frame per input event.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Steps in the dry-run sweep.
    #[arg(long, default_value_t = 100)]
    sweep_steps: usize,
}

fn main() -> Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();

    let mut cfg = TeleopConfig::load(args.config.as_deref())?;
    if let Some(root) = &args.data_root {
        cfg.data_root = root.clone();
    }
    if let Some(max) = args.max_frames {
        cfg.capture.max_frames = Some(max);
    }
    if let Some(mode) = args.mode {
        cfg.capture.mode = mode.into();
    }
    cfg.validate()?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            tracing::info!("interrupt received, stopping");
            running.store(false, Ordering::SeqCst);
        })
        .context("installing Ctrl-C handler")?;
    }

    let run_name = args.run.clone().unwrap_or_else(default_run_name);
    let recording = || -> Result<Option<Recording>> {
        if args.no_record {
            return Ok(None);
        }
        open_recording(&cfg, &run_name, args.dry_run).map(Some)
    };
    let controls = ControlState::new(cfg.axes);
    let opts = cfg.runtime_options();

    let report = if args.dry_run {
        run_dry(&cfg, &args, controls, recording, &opts, running)?
    } else {
        run_on_car(&cfg, controls, recording, &opts, running)?
    };
    tracing::info!(
        "session done: {} events, {} frames written, {} dropped",
        report.events,
        report.frames_written,
        report.frames_dropped
    );
    Ok(())
}

/// Open the input device and actuators, then the recording.
///
/// A run directory only appears once the hardware it would record is there.
fn start_session<H>(
    open_hardware: impl FnOnce() -> Result<H>,
    open_recording: impl FnOnce() -> Result<Option<Recording>>,
) -> Result<(H, Option<Recording>)> {
    let hardware = open_hardware()?;
    let recording = open_recording()?;
    Ok((hardware, recording))
}

fn open_recording(cfg: &TeleopConfig, run_name: &str, synthetic: bool) -> Result<Recording> {
    let session = RunSession::create(&cfg.data_root, run_name)?;
    let manifest = RunManifest {
        schema_version: RunManifestSchemaVersion::V1,
        run_dir: session.run_dir().to_path_buf(),
        started_at_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
        frame_size: (cfg.camera.width, cfg.camera.height),
        capture_fps: cfg.camera.fps,
        capture_mode: cfg.capture.mode,
        first_frame_index: session.first_index(),
        max_frames: cfg.capture.max_frames,
        steering_map: cfg.mapping.steering.as_array(),
        throttle_map: cfg.mapping.throttle.as_array(),
    };
    manifest.validate().map_err(anyhow::Error::msg)?;
    let manifest_path = session.write_manifest(&manifest)?;
    tracing::info!(
        "recording to {} (manifest {})",
        session.run_dir().display(),
        manifest_path.display()
    );

    let recorder = CsvRecorder::new(
        session,
        Some((cfg.camera.width, cfg.camera.height)),
        cfg.capture.jpeg_quality,
    )?;
    let camera: CameraOpener = if synthetic {
        let (w, h) = (cfg.camera.width, cfg.camera.height);
        Box::new(move || -> CaptureResult<Box<dyn FrameSource>> {
            Ok(Box::new(SyntheticSource::new(w, h)))
        })
    } else {
        camera_opener(cfg)
    };
    Ok(Recording {
        camera,
        recorder: Box::new(recorder),
    })
}

#[cfg(feature = "camera-v4l")]
fn camera_opener(cfg: &TeleopConfig) -> CameraOpener {
    let cam = cfg.camera.clone();
    Box::new(move || -> CaptureResult<Box<dyn FrameSource>> {
        // Cameras stream landscape; portrait frames come from the resize on write.
        let (w, h) = (cam.width.max(cam.height), cam.width.min(cam.height));
        let camera = capture_utils::V4lCamera::open(cam.index, w, h, cam.fps)?;
        Ok(Box::new(camera))
    })
}

#[cfg(not(feature = "camera-v4l"))]
fn camera_opener(cfg: &TeleopConfig) -> CameraOpener {
    let device = format!("/dev/video{}", cfg.camera.index);
    Box::new(move || -> CaptureResult<Box<dyn FrameSource>> {
        Err(capture_utils::CaptureError::Camera {
            device,
            message: "built without the `camera-v4l` feature".into(),
        })
    })
}

fn run_dry(
    cfg: &TeleopConfig,
    args: &Args,
    controls: ControlState,
    recording: impl FnOnce() -> Result<Option<Recording>>,
    opts: &RuntimeOptions,
    running: Arc<AtomicBool>,
) -> Result<TeleopReport> {
    let ((mut controller, log), recording) =
        start_session(|| Ok(fake_controller(cfg.mapping)?), recording)?;
    let interval = Duration::from_secs_f64(1.0 / cfg.camera.fps as f64);
    let mut events = ScriptedEvents::sweep(cfg.axes.steering, cfg.axes.throttle, args.sweep_steps)
        .with_interval(interval);
    let report = run_teleop(&mut events, &mut controller, controls, recording, opts, running)?;
    controller.release()?;
    let writes = log.lock().map(|w| w.len()).unwrap_or_default();
    tracing::info!("dry run: {writes} actuator writes");
    Ok(report)
}

#[cfg(all(feature = "evdev", feature = "rpi"))]
fn run_on_car(
    cfg: &TeleopConfig,
    controls: ControlState,
    recording: impl FnOnce() -> Result<Option<Recording>>,
    opts: &RuntimeOptions,
    running: Arc<AtomicBool>,
) -> Result<TeleopReport> {
    let ((mut events, mut controller), recording) = start_session(
        || {
            let events = teleop::EvdevSource::open(&cfg.device_path)?;
            let controller = actuation::rpi::open_rpi_controller(&cfg.pins, cfg.mapping)?;
            Ok((events, controller))
        },
        recording,
    )?;
    let report = run_teleop(&mut events, &mut controller, controls, recording, opts, running)?;
    controller.release()?;
    Ok(report)
}

#[cfg(not(all(feature = "evdev", feature = "rpi")))]
fn run_on_car(
    _cfg: &TeleopConfig,
    _controls: ControlState,
    _recording: impl FnOnce() -> Result<Option<Recording>>,
    _opts: &RuntimeOptions,
    _running: Arc<AtomicBool>,
) -> Result<TeleopReport> {
    anyhow::bail!("built without hardware support; rebuild with `--features car` or pass --dry-run")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(root: &std::path::Path) -> TeleopConfig {
        TeleopConfig {
            data_root: root.to_path_buf(),
            ..TeleopConfig::default()
        }
    }

    #[test]
    fn missing_hardware_leaves_no_run_directory() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let cfg = config_at(&tmp.path().join("data"));
        let result = start_session(
            || -> Result<()> { anyhow::bail!("no gamepad at /dev/input/event0") },
            || open_recording(&cfg, "2024_05_01_10_30", true).map(Some),
        );
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("no gamepad"), "{err}");
        assert!(!cfg.data_root.join("2024_05_01_10_30").exists());
        Ok(())
    }

    #[test]
    fn recording_opens_after_hardware() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let cfg = config_at(tmp.path());
        let (hardware, recording) = start_session(
            || Ok(7u8),
            || open_recording(&cfg, "run1", true).map(Some),
        )?;
        assert_eq!(hardware, 7);
        assert!(recording.is_some());
        assert!(tmp.path().join("run1").is_dir());
        Ok(())
    }
}
