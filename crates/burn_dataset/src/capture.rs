//! Loading a recorded run directory: `labels.csv` plus `images/<n>.jpg`.

use crate::aug::{add_gaussian_noise, DatasetConfig};
use crate::types::{BurnDatasetError, DatasetResult, DriveSample};
use data_contracts::{LabelRow, IMAGES_DIR, LABELS_FILE, LABEL_HEADER};
use image::imageops::FilterType;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Read every row of a label file.
///
/// A leading `filename,steering,throttle` header is skipped if present, so
/// files written before the header existed load too. Any malformed row fails
/// the whole read with its line number.
pub fn read_labels(path: &Path) -> DatasetResult<Vec<LabelRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| BurnDatasetError::Csv {
            path: path.to_path_buf(),
            line: 0,
            source,
        })?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let fallback_line = i as u64 + 1;
        let record = record.map_err(|source| BurnDatasetError::Csv {
            path: path.to_path_buf(),
            line: source
                .position()
                .map(|p| p.line())
                .unwrap_or(fallback_line),
            source,
        })?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_line);
        if i == 0 && is_header(&record) {
            continue;
        }
        let row: LabelRow =
            record
                .deserialize(None)
                .map_err(|source| BurnDatasetError::Csv {
                    path: path.to_path_buf(),
                    line,
                    source,
                })?;
        row.validate().map_err(|source| BurnDatasetError::Label {
            path: path.to_path_buf(),
            line,
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|first| first.eq_ignore_ascii_case(LABEL_HEADER[0]))
}

/// RGB pixels to a CHW `f32` buffer in [0, 1].
pub fn rgb_to_chw(rgb: &RgbImage) -> Vec<f32> {
    let (w, h) = rgb.dimensions();
    let plane = (w * h) as usize;
    let mut chw = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let idx = (y * w + x) as usize;
        for c in 0..3 {
            chw[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }
    chw
}

/// Indexed view over one run: row `i` of `labels.csv` and the image it names.
///
/// Images are read from disk on every [`DriveDataset::get`]; nothing is cached.
pub struct DriveDataset {
    run_dir: PathBuf,
    images_dir: PathBuf,
    rows: Vec<LabelRow>,
    cfg: DatasetConfig,
    noise_rng: Option<Mutex<StdRng>>,
}

impl DriveDataset {
    pub fn from_run_dir(run_dir: &Path, cfg: DatasetConfig) -> DatasetResult<Self> {
        let rows = read_labels(&run_dir.join(LABELS_FILE))?;
        Ok(Self::from_rows(run_dir, rows, cfg))
    }

    pub fn from_rows(run_dir: &Path, rows: Vec<LabelRow>, cfg: DatasetConfig) -> Self {
        let noise_rng = cfg.noise.map(|noise| {
            Mutex::new(match noise.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            })
        });
        Self {
            run_dir: run_dir.to_path_buf(),
            images_dir: run_dir.join(IMAGES_DIR),
            rows,
            cfg,
            noise_rng,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Drop rows whose image is not on disk. Returns how many rows were dropped.
    pub fn retain_existing_images(&mut self) -> usize {
        let before = self.rows.len();
        let images_dir = &self.images_dir;
        self.rows.retain(|row| images_dir.join(&row.filename).is_file());
        before - self.rows.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[LabelRow] {
        &self.rows
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.cfg
    }

    pub fn get(&self, index: usize) -> DatasetResult<DriveSample> {
        let row = self
            .rows
            .get(index)
            .ok_or(BurnDatasetError::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            })?;
        let path = self.images_dir.join(&row.filename);
        let img = image::open(&path)
            .map_err(|source| BurnDatasetError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        let img = match self.cfg.target_size {
            Some((w, h)) if img.dimensions() != (w, h) => {
                image::imageops::resize(&img, w, h, FilterType::Triangle)
            }
            _ => img,
        };
        let (width, height) = img.dimensions();
        let mut image_chw = rgb_to_chw(&img);

        if let (Some(noise), Some(rng)) = (self.cfg.noise, &self.noise_rng) {
            let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
            add_gaussian_noise(&mut image_chw, noise.sigma, &mut *rng);
        }

        Ok(DriveSample {
            index,
            image_chw,
            width,
            height,
            steering: row.steering as f32,
            throttle: row.throttle as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;

    #[test]
    fn chw_layout_puts_channels_in_planes() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 51]));
        let chw = rgb_to_chw(&img);
        assert_eq!(chw, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.2]);
    }

    #[test]
    fn rows_without_images_can_be_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let images = tmp.path().join(IMAGES_DIR);
        fs::create_dir_all(&images).unwrap();
        RgbImage::new(4, 4).save(images.join("1.jpg")).unwrap();
        RgbImage::new(4, 4).save(images.join("3.jpg")).unwrap();
        let rows = vec![
            LabelRow::new("1.jpg", 10, 20),
            LabelRow::new("2.jpg", 30, 40),
            LabelRow::new("3.jpg", 50, 60),
        ];
        let mut dataset = DriveDataset::from_rows(tmp.path(), rows, DatasetConfig::default());
        assert_eq!(dataset.retain_existing_images(), 1);
        let names: Vec<_> = dataset.rows().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["1.jpg", "3.jpg"]);
        assert_eq!(dataset.retain_existing_images(), 0);
    }

    #[test]
    fn labels_without_header_are_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("labels.csv");
        fs::write(&path, "1.jpg,10,20\n2.jpg, 30 ,40\n").unwrap();
        let rows = read_labels(&path).unwrap();
        assert_eq!(rows, vec![LabelRow::new("1.jpg", 10, 20), LabelRow::new("2.jpg", 30, 40)]);
    }

    #[test]
    fn malformed_row_reports_its_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("labels.csv");
        fs::write(&path, "filename,steering,throttle\n1.jpg,10,20\n2.jpg,abc,40\n").unwrap();
        match read_labels(&path) {
            Err(BurnDatasetError::Csv { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected csv error, got {other:?}"),
        }
    }

    #[test]
    fn escaping_filename_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("labels.csv");
        fs::write(&path, "../secret.jpg,1,2\n").unwrap();
        assert!(matches!(
            read_labels(&path),
            Err(BurnDatasetError::Label { line: 1, .. })
        ));
    }
}
