//! Frame capture and the on-disk run format written by the teleop logger.
//!
//! A session owns one run directory (`<data_root>/<run>/`) with JPEG frames in
//! `images/` and one `labels.csv` row per frame. Frame numbering resumes after
//! whatever a previous session left behind, so filenames never collide.

pub mod error;
pub mod frame;
pub mod recorder;
pub mod session;
#[cfg(feature = "camera-v4l")]
pub mod v4l_camera;

pub use error::{CaptureError, CaptureResult};
pub use frame::{resize_frame, warm_up, Frame, FrameSource, SyntheticSource};
pub use recorder::{CsvRecorder, FrameRecord, Recorder, DEFAULT_JPEG_QUALITY};
pub use session::{default_run_name, RunSession};
#[cfg(feature = "camera-v4l")]
pub use v4l_camera::V4lCamera;

pub mod prelude {
    pub use crate::frame::{Frame, FrameSource};
    pub use crate::recorder::{FrameRecord, Recorder};
    pub use crate::session::RunSession;
}
