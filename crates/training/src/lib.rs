#![recursion_limit = "256"]

pub mod metrics;
pub mod plot;
pub mod util;

pub use metrics::{EpochLosses, LossHistory};
pub use models::{DonkeyNet, DonkeyNetConfig, ModelKind};
pub use plot::plot_losses;
pub use util::{
    artifact_stem, load_checkpoint, run_train, test_epoch, train_epoch, TrainArgs,
    TrainArtifacts,
};
/// Backend alias for training (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
