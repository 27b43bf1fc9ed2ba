//! Shared data contracts for run directories, label rows, and run manifests.
//!
//! Both programs only meet on the filesystem: the teleop logger produces a run
//! directory, the trainer consumes it. The layout lives here so neither side
//! hard-codes it.

pub mod capture;
pub mod manifest;

pub use capture::{
    frame_filename, parse_frame_index, LabelRow, ValidationError, IMAGES_DIR, LABELS_FILE,
    LABEL_HEADER,
};
pub use manifest::{CaptureMode, RunManifest, RunManifestSchemaVersion, MANIFEST_FILE};
