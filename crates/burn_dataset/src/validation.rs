//! Run integrity checks: every row has its frame, every frame has its row.

use crate::capture::read_labels;
use crate::types::{
    BurnDatasetError, DatasetResult, RunSummary, ValidationOutcome, ValidationReport,
    ValidationThresholds,
};
use data_contracts::{parse_frame_index, IMAGES_DIR, LABELS_FILE};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub fn summarize_run(run_dir: &Path) -> DatasetResult<RunSummary> {
    let labels_path = run_dir.join(LABELS_FILE);
    let rows = if labels_path.exists() {
        read_labels(&labels_path)?
    } else {
        Vec::new()
    };

    let images_dir = run_dir.join(IMAGES_DIR);
    let mut images = HashSet::new();
    if images_dir.is_dir() {
        let entries = fs::read_dir(&images_dir).map_err(|source| BurnDatasetError::Io {
            path: images_dir.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if parse_frame_index(name).is_some() {
                    images.insert(name.to_string());
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut summary = RunSummary {
        run_dir: run_dir.to_path_buf(),
        rows: rows.len(),
        images: images.len(),
        ..RunSummary::default()
    };
    for row in &rows {
        if !seen.insert(row.filename.as_str()) {
            summary.duplicate_rows += 1;
        }
        if !images.contains(&row.filename) {
            summary.missing_images += 1;
        }
    }
    summary.orphan_images = images.iter().filter(|name| !seen.contains(name.as_str())).count();
    Ok(summary)
}

pub fn validate_summary(summary: RunSummary, thresholds: &ValidationThresholds) -> ValidationReport {
    let mut outcome = ValidationOutcome::Pass;
    let mut reasons = Vec::new();
    let mut warn = |reasons: &mut Vec<String>, msg: String| {
        if outcome == ValidationOutcome::Pass {
            outcome = ValidationOutcome::Warn;
        }
        reasons.push(msg);
    };

    if summary.missing_images > 0 {
        warn(&mut reasons, format!("{} rows without an image", summary.missing_images));
    }
    if summary.orphan_images > 0 {
        warn(&mut reasons, format!("{} images without a row", summary.orphan_images));
    }
    if summary.duplicate_rows > 0 {
        warn(&mut reasons, format!("{} duplicate rows", summary.duplicate_rows));
    }

    let mut fail = Vec::new();
    if summary.rows == 0 {
        fail.push("no labeled frames".to_string());
    }
    if let Some(max) = thresholds.max_missing {
        if summary.missing_images > max {
            fail.push(format!(
                "missing images: {} exceeds max {max}",
                summary.missing_images
            ));
        }
    }
    if let Some(max_r) = thresholds.max_missing_ratio {
        let ratio = summary.missing_images as f32 / summary.rows.max(1) as f32;
        if ratio > max_r {
            fail.push(format!("missing images: ratio {ratio:.3} exceeds max {max_r:.3}"));
        }
    }
    if let Some(max) = thresholds.max_orphans {
        if summary.orphan_images > max {
            fail.push(format!(
                "orphan images: {} exceeds max {max}",
                summary.orphan_images
            ));
        }
    }
    if !fail.is_empty() {
        outcome = ValidationOutcome::Fail;
        reasons.extend(fail);
    }

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}
