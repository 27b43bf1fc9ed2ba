use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Written once per session at the root of the run directory.
pub const MANIFEST_FILE: &str = "run_manifest.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunManifestSchemaVersion {
    V1,
}

/// What drives frame capture during a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Fixed clock at the configured frame rate.
    #[default]
    Periodic,
    /// One frame per input event.
    PerEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: RunManifestSchemaVersion,
    pub run_dir: PathBuf,
    pub started_at_unix: f64,
    /// Persisted frame size (width, height).
    pub frame_size: (u32, u32),
    pub capture_fps: u32,
    pub capture_mode: CaptureMode,
    /// First frame index written by this session (non-zero when a run dir is reopened).
    pub first_frame_index: u64,
    pub max_frames: Option<u64>,
    /// `[in_min, in_max, out_min, out_max]` for the steering servo.
    pub steering_map: [f64; 4],
    /// `[in_min, in_max, out_min, out_max]` for the drive motor.
    pub throttle_map: [f64; 4],
}

impl RunManifest {
    pub fn validate(&self) -> Result<(), String> {
        if self.started_at_unix.is_nan() || self.started_at_unix < 0.0 {
            return Err("started_at_unix must be non-negative".into());
        }
        if self.frame_size.0 == 0 || self.frame_size.1 == 0 {
            return Err("frame_size must be non-zero".into());
        }
        if self.capture_fps == 0 {
            return Err("capture_fps cannot be zero".into());
        }
        if let Some(max) = self.max_frames {
            if max == 0 {
                return Err("max_frames cannot be zero".into());
            }
        }
        Ok(())
    }
}
