use data_contracts::{CaptureMode, LabelRow, RunManifest, RunManifestSchemaVersion, ValidationError};

fn manifest() -> RunManifest {
    RunManifest {
        schema_version: RunManifestSchemaVersion::V1,
        run_dir: "data/2024_05_01_10_30".into(),
        started_at_unix: 1_714_559_400.0,
        frame_size: (120, 160),
        capture_fps: 20,
        capture_mode: CaptureMode::Periodic,
        first_frame_index: 1,
        max_frames: None,
        steering_map: [0.0, 255.0, 7.7, 11.7],
        throttle_map: [128.0, 0.0, 0.0, 80.0],
    }
}

#[test]
fn label_with_path_separator_rejected() {
    let row = LabelRow::new("../escape.jpg", 128, 64);
    let err = row.validate().unwrap_err();
    assert!(matches!(err, ValidationError::NotBareFilename(_)));
}

#[test]
fn empty_label_filename_rejected() {
    let row = LabelRow::new("  ", 0, 0);
    assert_eq!(row.validate(), Err(ValidationError::MissingFilename));
}

#[test]
fn numbered_label_passes() {
    let row = LabelRow::new("42.jpg", 128, 64);
    assert!(row.validate().is_ok());
    assert_eq!(row.frame_index(), Ok(42));
}

#[test]
fn manifest_serializes_capture_mode_snake_case() {
    let mut meta = manifest();
    meta.capture_mode = CaptureMode::PerEvent;
    let json = serde_json::to_string(&meta).unwrap();
    assert!(json.contains("\"per_event\""));
    let back: RunManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(back.capture_mode, CaptureMode::PerEvent);
}

#[test]
fn manifest_rejects_zero_fps() {
    let mut meta = manifest();
    assert!(meta.validate().is_ok());
    meta.capture_fps = 0;
    assert!(meta.validate().is_err());
}
