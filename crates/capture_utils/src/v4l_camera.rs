//! USB camera over Video4Linux2, streaming MJPEG through mmap buffers.

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, FrameSource};
use std::time::Instant;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

const BUFFER_COUNT: u32 = 4;

pub struct V4lCamera {
    device: String,
    stream: Stream<'static>,
    // Kept open for the lifetime of the stream.
    _dev: Device,
    started: Instant,
    next_id: u64,
}

impl V4lCamera {
    /// Open `/dev/video<index>` asking for MJPEG at `width`x`height` and `fps`.
    /// The driver may pick a nearby resolution; frames are resized on write.
    pub fn open(index: usize, width: u32, height: u32, fps: u32) -> CaptureResult<Self> {
        let device = format!("/dev/video{index}");
        let camera_err = |message: String| CaptureError::Camera {
            device: device.clone(),
            message,
        };

        let dev = Device::new(index).map_err(|e| camera_err(format!("open failed: {e}")))?;
        let mut fmt = dev
            .format()
            .map_err(|e| camera_err(format!("query format: {e}")))?;
        fmt.width = width;
        fmt.height = height;
        fmt.fourcc = FourCC::new(b"MJPG");
        let fmt = dev
            .set_format(&fmt)
            .map_err(|e| camera_err(format!("set format: {e}")))?;
        if fmt.fourcc != FourCC::new(b"MJPG") {
            return Err(camera_err(format!(
                "MJPEG not supported (driver chose {})",
                fmt.fourcc
            )));
        }
        if let Err(err) = dev.set_params(&Parameters::with_fps(fps)) {
            tracing::warn!("{device}: could not set {fps} fps: {err}");
        }
        let stream = Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| camera_err(format!("start stream: {e}")))?;
        tracing::info!(
            "camera {device} streaming {}x{} MJPEG",
            fmt.width,
            fmt.height
        );

        Ok(Self {
            device,
            stream,
            _dev: dev,
            started: Instant::now(),
            next_id: 0,
        })
    }
}

impl FrameSource for V4lCamera {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        let (buf, meta) = self.stream.next().map_err(|e| CaptureError::Camera {
            device: self.device.clone(),
            message: format!("dequeue: {e}"),
        })?;
        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            return Ok(None);
        }
        let rgb = match image::load_from_memory_with_format(&buf[..used], image::ImageFormat::Jpeg)
        {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                // Partial MJPEG frames happen when the USB bus is saturated.
                tracing::debug!("{}: dropping undecodable frame: {err}", self.device);
                return Ok(None);
            }
        };
        let id = self.next_id;
        self.next_id += 1;
        Ok(Some(Frame {
            id,
            timestamp: self.started.elapsed().as_secs_f64(),
            rgb,
        }))
    }
}
