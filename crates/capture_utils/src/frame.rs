use crate::error::CaptureResult;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use std::time::Instant;

/// One camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: u64,
    /// Seconds since the source started.
    pub timestamp: f64,
    pub rgb: RgbImage,
}

/// Pulls frames from some source (camera, test generator).
///
/// `Ok(None)` means the read produced no frame; callers skip it.
pub trait FrameSource {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Resize to the persisted resolution; frames already at that size are copied as-is.
pub fn resize_frame(rgb: &RgbImage, width: u32, height: u32) -> RgbImage {
    if rgb.dimensions() == (width, height) {
        return rgb.clone();
    }
    image::imageops::resize(rgb, width, height, FilterType::Triangle)
}

/// Discard `frames` reads so exposure settles, logging a countdown every 20 frames.
pub fn warm_up<S: FrameSource + ?Sized>(source: &mut S, frames: usize) -> CaptureResult<()> {
    for remaining in (0..frames).rev() {
        if remaining % 20 == 0 {
            tracing::info!("camera warm-up: {}", remaining / 20);
        }
        source.next_frame()?;
    }
    Ok(())
}

/// Deterministic gradient frames, shifted by frame id. Used for dry runs and tests.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    next_id: u64,
    started: Instant,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            next_id: 0,
            started: Instant::now(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        let id = self.next_id;
        self.next_id += 1;
        let shift = (id % 256) as u32;
        let (w, h) = (self.width, self.height);
        let rgb = RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                ((x * 255 / w + shift) % 256) as u8,
                ((y * 255 / h) % 256) as u8,
                (shift * 7 % 256) as u8,
            ])
        });
        Ok(Some(Frame {
            id,
            timestamp: self.started.elapsed().as_secs_f64(),
            rgb,
        }))
    }
}
