use crate::control::AxisCodes;
use crate::runtime::RuntimeOptions;
use actuation::{ControlMapping, LinearMap, PinConfig};
use capture_utils::DEFAULT_JPEG_QUALITY;
use data_contracts::CaptureMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "bearcart.toml";
pub const CONFIG_ENV: &str = "BEARCART_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub index: usize,
    pub fps: u32,
    /// Persisted frame width. Frames are portrait: 120 wide, 160 tall.
    pub width: u32,
    /// Persisted frame height.
    pub height: u32,
    pub warmup_frames: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            fps: 20,
            width: 120,
            height: 160,
            warmup_frames: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    pub queue_capacity: usize,
    pub jpeg_quality: u8,
    pub max_frames: Option<u64>,
    pub record_at_start: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Periodic,
            queue_capacity: 32,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_frames: None,
            record_at_start: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeleopConfig {
    pub device_path: PathBuf,
    pub data_root: PathBuf,
    pub pins: PinConfig,
    pub axes: AxisCodes,
    pub mapping: ControlMapping,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/event0"),
            data_root: PathBuf::from("data"),
            pins: PinConfig::default(),
            axes: AxisCodes::default(),
            mapping: ControlMapping::default(),
            camera: CameraConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TeleopConfigFile {
    device_path: Option<String>,
    data_root: Option<String>,
    pins: Option<PinsSection>,
    axes: Option<AxesSection>,
    mapping: Option<MappingSection>,
    camera: Option<CameraSection>,
    capture: Option<CaptureSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PinsSection {
    motor_pwm: Option<u8>,
    motor_direction: Option<u8>,
    servo: Option<u8>,
    motor_frequency_hz: Option<f64>,
    servo_frequency_hz: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AxesSection {
    steering: Option<u16>,
    throttle: Option<u16>,
    record_toggle: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MappingSection {
    /// `[in_min, in_max, out_min, out_max]`
    steering: Option<[f64; 4]>,
    throttle: Option<[f64; 4]>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraSection {
    index: Option<usize>,
    fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    warmup_frames: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureSection {
    mode: Option<CaptureMode>,
    queue_capacity: Option<usize>,
    jpeg_quality: Option<u8>,
    max_frames: Option<u64>,
    record_at_start: Option<bool>,
}

fn linear_map([in_min, in_max, out_min, out_max]: [f64; 4]) -> LinearMap {
    LinearMap::new(in_min, in_max, out_min, out_max)
}

impl TeleopConfig {
    /// Resolve the config file: `explicit` (from `--config`), then
    /// `BEARCART_CONFIG`, then `./bearcart.toml`. Only the last may be absent,
    /// in which case defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = if let Some(path) = explicit {
            Self::from_path(path)?
        } else if let Ok(path) = std::env::var(CONFIG_ENV) {
            Self::from_path(Path::new(&path))?
        } else {
            let path = Path::new(DEFAULT_CONFIG_NAME);
            if path.exists() {
                Self::from_path(path)?
            } else {
                tracing::debug!("no {DEFAULT_CONFIG_NAME}; using defaults");
                Self::default()
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let file: TeleopConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: TeleopConfigFile) -> Self {
        let defaults = Self::default();
        let pins = file.pins.unwrap_or_default();
        let axes = file.axes.unwrap_or_default();
        let mapping = file.mapping.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let capture = file.capture.unwrap_or_default();

        TeleopConfig {
            device_path: file
                .device_path
                .map(PathBuf::from)
                .unwrap_or(defaults.device_path),
            data_root: file
                .data_root
                .map(PathBuf::from)
                .unwrap_or(defaults.data_root),
            pins: PinConfig {
                motor_pwm: pins.motor_pwm.unwrap_or(defaults.pins.motor_pwm),
                motor_direction: pins
                    .motor_direction
                    .unwrap_or(defaults.pins.motor_direction),
                servo: pins.servo.unwrap_or(defaults.pins.servo),
                motor_frequency_hz: pins
                    .motor_frequency_hz
                    .unwrap_or(defaults.pins.motor_frequency_hz),
                servo_frequency_hz: pins
                    .servo_frequency_hz
                    .unwrap_or(defaults.pins.servo_frequency_hz),
            },
            axes: AxisCodes {
                steering: axes.steering.unwrap_or(defaults.axes.steering),
                throttle: axes.throttle.unwrap_or(defaults.axes.throttle),
                record_toggle: axes.record_toggle.or(defaults.axes.record_toggle),
            },
            mapping: ControlMapping {
                steering: mapping
                    .steering
                    .map(linear_map)
                    .unwrap_or(defaults.mapping.steering),
                throttle: mapping
                    .throttle
                    .map(linear_map)
                    .unwrap_or(defaults.mapping.throttle),
            },
            camera: CameraConfig {
                index: camera.index.unwrap_or(defaults.camera.index),
                fps: camera.fps.unwrap_or(defaults.camera.fps),
                width: camera.width.unwrap_or(defaults.camera.width),
                height: camera.height.unwrap_or(defaults.camera.height),
                warmup_frames: camera
                    .warmup_frames
                    .unwrap_or(defaults.camera.warmup_frames),
            },
            capture: CaptureConfig {
                mode: capture.mode.unwrap_or(defaults.capture.mode),
                queue_capacity: capture
                    .queue_capacity
                    .unwrap_or(defaults.capture.queue_capacity),
                jpeg_quality: capture
                    .jpeg_quality
                    .unwrap_or(defaults.capture.jpeg_quality),
                max_frames: capture.max_frames.or(defaults.capture.max_frames),
                record_at_start: capture
                    .record_at_start
                    .unwrap_or(defaults.capture.record_at_start),
            },
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            capture_mode: self.capture.mode,
            fps: self.camera.fps,
            queue_capacity: self.capture.queue_capacity,
            warmup_frames: self.camera.warmup_frames,
            max_frames: self.capture.max_frames,
            record_at_start: self.capture.record_at_start,
            ..RuntimeOptions::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.camera.fps == 0 {
            return invalid("camera.fps must be > 0".into());
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return invalid(format!(
                "camera size {}x{} must be non-zero",
                self.camera.width, self.camera.height
            ));
        }
        if self.capture.queue_capacity == 0 {
            return invalid("capture.queue_capacity must be > 0".into());
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return invalid(format!(
                "capture.jpeg_quality {} outside 1..=100",
                self.capture.jpeg_quality
            ));
        }
        if self.capture.max_frames == Some(0) {
            return invalid("capture.max_frames cannot be zero".into());
        }
        for (name, map) in [
            ("steering", self.mapping.steering),
            ("throttle", self.mapping.throttle),
        ] {
            if !map.is_valid() {
                return invalid(format!("mapping.{name} is degenerate: {:?}", map.as_array()));
            }
        }
        if self.axes.steering == self.axes.throttle {
            return invalid(format!(
                "steering and throttle share axis code {}",
                self.axes.steering
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = TeleopConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, TeleopConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_fps_rejected() {
        let cfg = TeleopConfig::from_toml_str("[camera]\nfps = 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(TeleopConfig::from_toml_str("[camera]\nfsp = 30\n").is_err());
    }
}
