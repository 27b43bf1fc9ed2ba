//! Dataset loading, splitting, and Burn-compatible batching for recorded drive runs.
//!
//! This crate provides utilities for:
//! - Reading `labels.csv` and the matching JPEG frames of one run directory
//! - Random train/test splitting
//! - Gaussian pixel noise augmentation
//! - Burn-compatible batch iteration
//! - Run integrity summaries (missing and orphan frames)

pub mod aug;
pub mod capture;
pub mod splits;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod batch;

pub use aug::{add_gaussian_noise, DatasetConfig, NoiseConfig};
pub use capture::{read_labels, rgb_to_chw, DriveDataset};
pub use splits::{split_indices, train_size};
pub use types::*;
pub use validation::{summarize_run, validate_summary};

#[cfg(feature = "burn-runtime")]
pub use batch::{BatchIter, DriveBatch};
