use crate::error::{CaptureError, CaptureResult};
use data_contracts::{
    frame_filename, parse_frame_index, RunManifest, IMAGES_DIR, LABELS_FILE, MANIFEST_FILE,
};
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

/// Run directory name for "now", minute resolution (`YYYY_MM_DD_HH_MM`).
pub fn default_run_name() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]_[month]_[day]_[hour]_[minute]"
    ))
    .unwrap_or_else(|_| format!("run_{}", now.unix_timestamp()))
}

/// An open run directory and its frame counter.
///
/// The counter starts after the highest frame index found in `images/` or
/// `labels.csv`, so reopening a directory (two sessions inside the same
/// minute, or an explicit `--run`) appends instead of overwriting.
#[derive(Debug)]
pub struct RunSession {
    run_dir: PathBuf,
    images_dir: PathBuf,
    labels_path: PathBuf,
    first_index: u64,
    next_index: u64,
}

impl RunSession {
    /// Open (creating if needed) `<data_root>/<name>`.
    pub fn create(data_root: &Path, name: &str) -> CaptureResult<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(CaptureError::InvalidRunName(name.to_string()));
        }
        Self::open(&data_root.join(trimmed))
    }

    pub fn open(run_dir: &Path) -> CaptureResult<Self> {
        let images_dir = run_dir.join(IMAGES_DIR);
        // create_dir_all tolerates a directory that already exists (or is
        // created concurrently); every other failure is returned.
        fs::create_dir_all(&images_dir).map_err(|e| CaptureError::io(&images_dir, e))?;
        let labels_path = run_dir.join(LABELS_FILE);

        let highest = highest_image_index(&images_dir)?.max(highest_label_index(&labels_path)?);
        let first_index = highest + 1;
        if highest > 0 {
            tracing::info!(
                "run {} already holds frames up to {}; continuing at {}",
                run_dir.display(),
                highest,
                first_index
            );
        }
        Ok(Self {
            run_dir: run_dir.to_path_buf(),
            images_dir,
            labels_path,
            first_index,
            next_index: first_index,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn labels_path(&self) -> &Path {
        &self.labels_path
    }

    /// First frame index handed out by this session.
    pub fn first_index(&self) -> u64 {
        self.first_index
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Reserve the next frame index and its filename.
    pub fn allocate(&mut self) -> (u64, String) {
        let index = self.next_index;
        self.next_index += 1;
        (index, frame_filename(index))
    }

    /// Write the session manifest. The first session of a run owns
    /// `run_manifest.json`; later sessions get `run_manifest.<first_index>.json`.
    pub fn write_manifest(&self, manifest: &RunManifest) -> CaptureResult<PathBuf> {
        let mut path = self.run_dir.join(MANIFEST_FILE);
        if path.exists() {
            path = self
                .run_dir
                .join(format!("run_manifest.{}.json", self.first_index));
        }
        let serialized = serde_json::to_string_pretty(manifest).map_err(|e| CaptureError::Json {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, serialized).map_err(|e| CaptureError::io(&path, e))?;
        Ok(path)
    }
}

fn highest_image_index(images_dir: &Path) -> CaptureResult<u64> {
    let mut highest = 0;
    let entries = fs::read_dir(images_dir).map_err(|e| CaptureError::io(images_dir, e))?;
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_frame_index) {
            highest = highest.max(index);
        }
    }
    Ok(highest)
}

fn highest_label_index(labels_path: &Path) -> CaptureResult<u64> {
    if !labels_path.exists() {
        return Ok(0);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(labels_path)
        .map_err(|e| CaptureError::Csv {
            path: labels_path.to_path_buf(),
            source: e,
        })?;
    let mut highest = 0;
    for record in reader.records() {
        let record = record.map_err(|e| CaptureError::Csv {
            path: labels_path.to_path_buf(),
            source: e,
        })?;
        if let Some(index) = record.get(0).and_then(parse_frame_index) {
            highest = highest.max(index);
        }
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RunSession::create(dir.path(), "2024_05_01_10_30").unwrap();
        assert!(session.images_dir().is_dir());
        assert_eq!(session.allocate(), (1, "1.jpg".to_string()));
        assert_eq!(session.allocate(), (2, "2.jpg".to_string()));
    }

    #[test]
    fn reopened_run_continues_after_existing_frames() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run");
        fs::create_dir_all(run.join(IMAGES_DIR)).unwrap();
        fs::write(run.join(IMAGES_DIR).join("3.jpg"), []).unwrap();
        fs::write(run.join(IMAGES_DIR).join("notes.txt"), []).unwrap();
        fs::write(run.join(LABELS_FILE), "filename,steering,throttle\n7.jpg,1,2\n").unwrap();

        let mut session = RunSession::open(&run).unwrap();
        assert_eq!(session.first_index(), 8);
        assert_eq!(session.allocate().1, "8.jpg");
    }

    #[test]
    fn run_name_with_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunSession::create(dir.path(), "../elsewhere").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRunName(_)));
    }

    #[test]
    fn default_run_name_has_minute_resolution() {
        let name = default_run_name();
        assert_eq!(name.split('_').count(), 5, "{name}");
    }
}
