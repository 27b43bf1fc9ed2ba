//! Core types, error definitions, and data structures for burn_dataset.

use data_contracts::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, BurnDatasetError>;

#[derive(Debug, Error)]
pub enum BurnDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label file {path} line {line}: {source}")]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("label file {path} line {line}: {source}")]
    Label {
        path: PathBuf,
        line: u64,
        #[source]
        source: ValidationError,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sample index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("{0}")]
    Other(String),
}

/// One loaded frame with its regression targets.
#[derive(Debug, Clone)]
pub struct DriveSample {
    pub index: usize,
    /// Image in CHW layout (RGB), normalized to [0, 1].
    pub image_chw: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Raw axis values as recorded, not rescaled.
    pub steering: f32,
    pub throttle: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    /// Rows in `labels.csv` (header excluded).
    pub rows: usize,
    /// Frame files in `images/`.
    pub images: usize,
    /// Rows whose image file does not exist.
    pub missing_images: usize,
    /// Frame files no row points at.
    pub orphan_images: usize,
    /// Rows naming a file an earlier row already named.
    pub duplicate_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_missing: Option<usize>,
    pub max_missing_ratio: Option<f32>,
    pub max_orphans: Option<usize>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok()?.trim().parse().ok()
        }
        ValidationThresholds {
            max_missing: parse("BURN_DATASET_MAX_MISSING"),
            max_missing_ratio: parse("BURN_DATASET_MAX_MISSING_RATIO"),
            max_orphans: parse("BURN_DATASET_MAX_ORPHANS"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: RunSummary,
}
