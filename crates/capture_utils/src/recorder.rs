use crate::error::{CaptureError, CaptureResult};
use crate::frame::{resize_frame, Frame};
use crate::session::RunSession;
use data_contracts::{LabelRow, LABEL_HEADER};
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// A frame plus the control values that were active when it was grabbed.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub frame: Frame,
    pub steering: i32,
    pub throttle: i32,
}

/// Persists frames and their labels to a sink.
pub trait Recorder {
    fn record(&mut self, record: &FrameRecord) -> CaptureResult<LabelRow>;
}

/// Default file-based recorder: `images/<n>.jpg` plus one `labels.csv` row per frame.
///
/// The image is written before its row, and the row is flushed right away, so
/// a crash can leave at most one unlabeled image and never a dangling row.
pub struct CsvRecorder {
    session: RunSession,
    writer: csv::Writer<File>,
    frame_size: Option<(u32, u32)>,
    jpeg_quality: u8,
    written: u64,
}

impl CsvRecorder {
    /// `frame_size` is the persisted (width, height); `None` keeps frames as captured.
    pub fn new(
        session: RunSession,
        frame_size: Option<(u32, u32)>,
        jpeg_quality: u8,
    ) -> CaptureResult<Self> {
        let labels_path = session.labels_path().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&labels_path)
            .map_err(|e| CaptureError::io(&labels_path, e))?;
        let is_new = file
            .metadata()
            .map_err(|e| CaptureError::io(&labels_path, e))?
            .len()
            == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer
                .write_record(LABEL_HEADER)
                .and_then(|_| writer.flush().map_err(csv::Error::from))
                .map_err(|e| CaptureError::Csv {
                    path: labels_path.clone(),
                    source: e,
                })?;
        }
        Ok(Self {
            session,
            writer,
            frame_size,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            written: 0,
        })
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    /// Frames written by this recorder (not counting earlier sessions).
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_jpeg(&self, rgb: &image::RgbImage, filename: &str) -> CaptureResult<()> {
        let path = self.session.images_dir().join(filename);
        let file = File::create(&path).map_err(|e| CaptureError::io(&path, e))?;
        let mut out = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
        if let Err(source) = rgb.write_with_encoder(encoder) {
            let _ = fs::remove_file(&path);
            return Err(CaptureError::Image { path, source });
        }
        out.flush().map_err(|e| CaptureError::io(&path, e))
    }
}

impl Recorder for CsvRecorder {
    fn record(&mut self, record: &FrameRecord) -> CaptureResult<LabelRow> {
        let rgb = match self.frame_size {
            Some((w, h)) => resize_frame(&record.frame.rgb, w, h),
            None => record.frame.rgb.clone(),
        };
        let (_, filename) = self.session.allocate();
        self.write_jpeg(&rgb, &filename)?;

        let row = LabelRow::new(filename, record.steering, record.throttle);
        row.validate()?;
        let labels_path = self.session.labels_path().to_path_buf();
        self.writer
            .serialize(&row)
            .and_then(|_| self.writer.flush().map_err(csv::Error::from))
            .map_err(|e| CaptureError::Csv {
                path: labels_path,
                source: e,
            })?;
        self.written += 1;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameSource, SyntheticSource};

    #[test]
    fn csv_recorder_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run");
        for _ in 0..2 {
            let session = RunSession::open(&run).unwrap();
            let mut recorder = CsvRecorder::new(session, None, DEFAULT_JPEG_QUALITY).unwrap();
            let frame = SyntheticSource::new(4, 4).next_frame().unwrap().unwrap();
            recorder
                .record(&FrameRecord {
                    frame,
                    steering: 10,
                    throttle: 20,
                })
                .unwrap();
        }
        let contents = fs::read_to_string(run.join("labels.csv")).unwrap();
        assert_eq!(
            contents,
            "filename,steering,throttle\n1.jpg,10,20\n2.jpg,10,20\n"
        );
    }

    #[test]
    fn frames_are_resized_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let session = RunSession::create(dir.path(), "run").unwrap();
        let mut recorder = CsvRecorder::new(session, Some((16, 12)), 80).unwrap();
        let frame = SyntheticSource::new(64, 48).next_frame().unwrap().unwrap();
        let row = recorder
            .record(&FrameRecord {
                frame,
                steering: 0,
                throttle: 128,
            })
            .unwrap();
        let img = image::open(dir.path().join("run/images").join(&row.filename)).unwrap();
        assert_eq!((img.width(), img.height()), (16, 12));
    }
}
