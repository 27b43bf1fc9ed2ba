use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subdirectory of a run holding the captured JPEG frames.
pub const IMAGES_DIR: &str = "images";
/// Label file at the root of a run directory.
pub const LABELS_FILE: &str = "labels.csv";
/// Column names written as the first line of a freshly created label file.
pub const LABEL_HEADER: [&str; 3] = ["filename", "steering", "throttle"];

/// One row of `labels.csv`: the frame filename and the raw control values
/// that were active when the frame was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow {
    pub filename: String,
    pub steering: i32,
    pub throttle: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("label row has an empty filename")]
    MissingFilename,
    #[error("label filename {0:?} must be a bare file name")]
    NotBareFilename(String),
    #[error("label filename {0:?} is not a numbered .jpg frame")]
    NotFrameFilename(String),
}

impl LabelRow {
    pub fn new(filename: impl Into<String>, steering: i32, throttle: i32) -> Self {
        Self {
            filename: filename.into(),
            steering,
            throttle,
        }
    }

    /// Rows must point at a file directly inside `images/`; anything else
    /// would let a label escape the run directory.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.filename.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingFilename);
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ValidationError::NotBareFilename(self.filename.clone()));
        }
        Ok(())
    }

    /// Frame index encoded in the filename, if it follows the `<n>.jpg` scheme.
    pub fn frame_index(&self) -> Result<u64, ValidationError> {
        parse_frame_index(&self.filename)
            .ok_or_else(|| ValidationError::NotFrameFilename(self.filename.clone()))
    }
}

/// File name for frame `index` (`<n>.jpg`).
pub fn frame_filename(index: u64) -> String {
    format!("{index}.jpg")
}

/// Inverse of [`frame_filename`]; returns `None` for anything else.
pub fn parse_frame_index(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".jpg")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_filename_round_trips_index() {
        assert_eq!(frame_filename(17), "17.jpg");
        assert_eq!(parse_frame_index("17.jpg"), Some(17));
    }

    #[test]
    fn parse_frame_index_rejects_foreign_names() {
        assert_eq!(parse_frame_index("frame.jpg"), None);
        assert_eq!(parse_frame_index("12.png"), None);
        assert_eq!(parse_frame_index(".jpg"), None);
        assert_eq!(parse_frame_index("-3.jpg"), None);
    }
}
