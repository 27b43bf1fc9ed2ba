use capture_utils::{CsvRecorder, FrameRecord, Recorder, RunSession, SyntheticSource};
use capture_utils::prelude::FrameSource;
use data_contracts::{CaptureMode, RunManifest, RunManifestSchemaVersion};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn record_frames(run_dir: &Path, count: usize, steering: i32) -> Vec<String> {
    let session = RunSession::open(run_dir).unwrap();
    let mut recorder = CsvRecorder::new(session, Some((32, 24)), 85).unwrap();
    let mut source = SyntheticSource::new(64, 48);
    let mut names = Vec::new();
    for _ in 0..count {
        let frame = source.next_frame().unwrap().unwrap();
        let row = recorder
            .record(&FrameRecord {
                frame,
                steering,
                throttle: 100,
            })
            .expect("record");
        names.push(row.filename);
    }
    assert_eq!(recorder.written(), count as u64);
    names
}

fn label_rows(run_dir: &Path) -> Vec<(String, i32, i32)> {
    let mut reader = csv::Reader::from_path(run_dir.join("labels.csv")).unwrap();
    reader
        .deserialize::<(String, i32, i32)>()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn every_row_has_exactly_one_image() {
    let tmp = tempdir().unwrap();
    let run_dir = tmp.path().join("2024_06_01_09_15");
    record_frames(&run_dir, 5, 40);

    let rows = label_rows(&run_dir);
    let images: Vec<_> = fs::read_dir(run_dir.join("images"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(images.len(), rows.len());
    for (filename, steering, throttle) in rows {
        assert!(run_dir.join("images").join(&filename).is_file(), "{filename}");
        assert_eq!((steering, throttle), (40, 100));
    }
}

#[test]
fn reopened_run_never_reuses_filenames() {
    let tmp = tempdir().unwrap();
    let run_dir = tmp.path().join("run");
    let first = record_frames(&run_dir, 3, 10);
    let second = record_frames(&run_dir, 3, 20);

    assert_eq!(first, ["1.jpg", "2.jpg", "3.jpg"]);
    assert_eq!(second, ["4.jpg", "5.jpg", "6.jpg"]);

    let rows = label_rows(&run_dir);
    let unique: HashSet<_> = rows.iter().map(|(name, _, _)| name.clone()).collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(unique.len(), 6);
    assert_eq!(rows[0].1, 10);
    assert_eq!(rows[5].1, 20);
}

#[test]
fn second_session_writes_its_own_manifest() {
    let tmp = tempdir().unwrap();
    let run_dir = tmp.path().join("run");
    let manifest = |first_frame_index| RunManifest {
        schema_version: RunManifestSchemaVersion::V1,
        run_dir: run_dir.clone(),
        started_at_unix: 0.0,
        frame_size: (32, 24),
        capture_fps: 20,
        capture_mode: CaptureMode::Periodic,
        first_frame_index,
        max_frames: None,
        steering_map: [0.0, 255.0, 7.7, 11.7],
        throttle_map: [128.0, 0.0, 0.0, 80.0],
    };

    let session = RunSession::open(&run_dir).unwrap();
    let first = session.write_manifest(&manifest(1)).unwrap();
    record_frames(&run_dir, 2, 0);
    let session = RunSession::open(&run_dir).unwrap();
    let second = session
        .write_manifest(&manifest(session.first_index()))
        .unwrap();

    assert_eq!(first.file_name().unwrap(), "run_manifest.json");
    assert_eq!(second.file_name().unwrap(), "run_manifest.3.json");
}
