//! Integration tests for end-to-end burn_dataset workflows.
//!
//! 1. Run directory → dataset → samples
//! 2. Split → batches on the NdArray backend
//! 3. Run directory → integrity summary → validation outcome

use burn_dataset::{
    split_indices, summarize_run, validate_summary, BatchIter, BurnDatasetError, DatasetConfig,
    DriveDataset, NoiseConfig, ValidationOutcome, ValidationThresholds,
};
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

type B = NdArray<f32>;

/// A run directory with `frames` JPEGs of `w`x`h` and a header-first labels.csv.
fn create_synthetic_run(root: &Path, frames: usize, w: u32, h: u32) -> anyhow::Result<PathBuf> {
    let run_dir = root.join("2024_05_01_10_30");
    let images = run_dir.join("images");
    fs::create_dir_all(&images)?;
    let mut labels = String::from("filename,steering,throttle\n");
    for i in 1..=frames {
        let img = RgbImage::from_pixel(w, h, Rgb([(i * 20) as u8, 128, 200]));
        img.save(images.join(format!("{i}.jpg")))?;
        labels.push_str(&format!("{i}.jpg,{},{}\n", i * 10, 128 - i as i32));
    }
    fs::write(run_dir.join("labels.csv"), labels)?;
    Ok(run_dir)
}

#[test]
fn dataset_length_matches_rows_and_rejects_out_of_range() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let run_dir = create_synthetic_run(tmp.path(), 10, 16, 12)?;
    let dataset = DriveDataset::from_run_dir(&run_dir, DatasetConfig::default())?;

    assert_eq!(dataset.len(), 10);
    let sample = dataset.get(2)?;
    assert_eq!((sample.width, sample.height), (16, 12));
    assert_eq!(sample.image_chw.len(), 3 * 16 * 12);
    assert_eq!((sample.steering, sample.throttle), (30.0, 125.0));
    assert!(sample.image_chw.iter().all(|v| (0.0..=1.0).contains(v)));

    match dataset.get(10) {
        Err(BurnDatasetError::IndexOutOfBounds { index, len }) => assert_eq!((index, len), (10, 10)),
        other => panic!("expected IndexOutOfBounds, got {:?}", other.map(|s| s.index)),
    }
    Ok(())
}

#[test]
fn target_size_and_noise_apply_per_sample() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let run_dir = create_synthetic_run(tmp.path(), 3, 32, 24)?;
    let cfg = DatasetConfig {
        target_size: Some((8, 6)),
        noise: Some(NoiseConfig {
            sigma: 0.3,
            seed: Some(5),
        }),
    };
    let dataset = DriveDataset::from_run_dir(&run_dir, cfg)?;
    let a = dataset.get(0)?;
    let b = dataset.get(0)?;
    assert_eq!((a.width, a.height), (8, 6));
    assert!(a.image_chw.iter().chain(&b.image_chw).all(|v| (0.0..=1.0).contains(v)));
    // fresh noise on every read
    assert_ne!(a.image_chw, b.image_chw);
    Ok(())
}

#[test]
fn ten_frames_with_batch_125_give_one_batch_per_split() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let run_dir = create_synthetic_run(tmp.path(), 10, 16, 12)?;
    let dataset = DriveDataset::from_run_dir(&run_dir, DatasetConfig::default())?;
    let device = Default::default();

    let (train, test) = split_indices(dataset.len(), 0.9, Some(42));
    assert_eq!(train.len() + test.len(), dataset.len());
    assert_eq!(train.len(), 9);

    let mut train_iter = BatchIter::new(train, 125);
    let mut test_iter = BatchIter::new(test, 125);
    assert_eq!((train_iter.num_batches(), test_iter.num_batches()), (1, 1));

    let batch = train_iter
        .next_batch::<B>(&dataset, &device)?
        .expect("one train batch");
    assert_eq!(batch.images.dims(), [9, 3, 12, 16]);
    assert_eq!(batch.targets.dims(), [9, 2]);
    assert!(train_iter.next_batch::<B>(&dataset, &device)?.is_none());

    let batch = test_iter
        .next_batch::<B>(&dataset, &device)?
        .expect("one test batch");
    assert_eq!(batch.images.dims(), [1, 3, 12, 16]);
    assert!(test_iter.next_batch::<B>(&dataset, &device)?.is_none());
    Ok(())
}

#[test]
fn batches_carry_targets_in_index_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let run_dir = create_synthetic_run(tmp.path(), 5, 8, 8)?;
    let dataset = DriveDataset::from_run_dir(&run_dir, DatasetConfig::default())?;
    let device = Default::default();

    let mut iter = BatchIter::new(vec![4, 0], 2);
    let batch = iter.next_batch::<B>(&dataset, &device)?.expect("batch");
    let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
    assert_eq!(targets, vec![50.0, 123.0, 10.0, 127.0]);

    iter.reset::<rand::rngs::StdRng>(None);
    assert!(iter.next_batch::<B>(&dataset, &device)?.is_some());
    Ok(())
}

#[test]
fn summary_flags_missing_and_orphan_frames() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let run_dir = create_synthetic_run(tmp.path(), 4, 8, 8)?;
    fs::remove_file(run_dir.join("images/2.jpg"))?;
    RgbImage::new(8, 8).save(run_dir.join("images/9.jpg"))?;

    let summary = summarize_run(&run_dir)?;
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.images, 4);
    assert_eq!(summary.missing_images, 1);
    assert_eq!(summary.orphan_images, 1);

    let report = validate_summary(summary, &ValidationThresholds::default());
    assert_eq!(report.outcome, ValidationOutcome::Warn);

    let strict = ValidationThresholds {
        max_missing: Some(0),
        ..ValidationThresholds::default()
    };
    let report = validate_summary(summarize_run(&run_dir)?, &strict);
    assert_eq!(report.outcome, ValidationOutcome::Fail);
    Ok(())
}
