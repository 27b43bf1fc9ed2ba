//! Burn models for steering/throttle regression.
//!
//! `DonkeyNet` is a small five-convolution network over camera frames that
//! regresses two outputs per image: steering and throttle.
//!
//! Shapes:
//! - Input images: `[N, 3, H, W]` in [0, 1]
//! - Output: `[N, 2]` (steering, throttle)

use burn::module::{Ignored, Module};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// (out_channels, kernel, stride) of each convolution, in order.
const CONV_LAYERS: [(usize, usize, usize); 5] =
    [(24, 5, 2), (32, 5, 2), (64, 5, 2), (64, 3, 1), (64, 3, 1)];
const HIDDEN: usize = 128;
const OUTPUTS: usize = 2;

/// Architectures the trainer can build; the name goes into artifact filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    DonkeyNet,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::DonkeyNet => "DonkeyNet",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonkeyNetConfig {
    /// Input frame height in pixels.
    pub height: usize,
    /// Input frame width in pixels.
    pub width: usize,
    /// Dropout probability after each hidden dense layer.
    pub dropout: f64,
}

impl Default for DonkeyNetConfig {
    fn default() -> Self {
        Self {
            height: 160,
            width: 120,
            dropout: 0.1,
        }
    }
}

impl DonkeyNetConfig {
    /// Spatial size after the convolution stack, or `None` if the input is too small.
    pub fn conv_output_size(&self) -> Option<(usize, usize)> {
        CONV_LAYERS
            .iter()
            .try_fold((self.height, self.width), |(h, w), &(_, k, s)| {
                Some((valid_conv_len(h, k, s)?, valid_conv_len(w, k, s)?))
            })
    }

    /// Width of the flattened feature vector feeding the dense head.
    pub fn flatten_dim(&self) -> Option<usize> {
        let out_channels = CONV_LAYERS[CONV_LAYERS.len() - 1].0;
        self.conv_output_size().map(|(h, w)| out_channels * h * w)
    }
}

/// `floor((n - k) / s) + 1` for an unpadded convolution.
fn valid_conv_len(n: usize, kernel: usize, stride: usize) -> Option<usize> {
    n.checked_sub(kernel).map(|d| d / stride + 1)
}

#[derive(Module, Debug)]
pub struct DonkeyNet<B: Backend> {
    convs: Vec<Conv2d<B>>,
    dense1: Linear<B>,
    dense2: Linear<B>,
    head: Linear<B>,
    dropout: Dropout,
    pub config: Ignored<DonkeyNetConfig>,
}

impl<B: Backend> DonkeyNet<B> {
    /// Build a freshly initialized network.
    ///
    /// Returns `None` when the configured input is smaller than the
    /// convolution stack's receptive field.
    pub fn new(config: DonkeyNetConfig, device: &B::Device) -> Option<Self> {
        let flatten_dim = config.flatten_dim()?;
        let mut in_channels = 3;
        let convs = CONV_LAYERS
            .iter()
            .map(|&(out_channels, k, s)| {
                let conv = Conv2dConfig::new([in_channels, out_channels], [k, k])
                    .with_stride([s, s])
                    .init(device);
                in_channels = out_channels;
                conv
            })
            .collect();
        Some(Self {
            convs,
            dense1: LinearConfig::new(flatten_dim, HIDDEN).init(device),
            dense2: LinearConfig::new(HIDDEN, HIDDEN).init(device),
            head: LinearConfig::new(HIDDEN, OUTPUTS).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            config: Ignored(config),
        })
    }

    /// Forward pass: `[N, 3, H, W]` → `[N, 2]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }
        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.dropout.forward(relu(self.dense1.forward(x)));
        let x = self.dropout.forward(relu(self.dense2.forward(x)));
        self.head.forward(x)
    }
}

pub mod prelude {
    pub use super::{DonkeyNet, DonkeyNetConfig, ModelKind};
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn default_input_flattens_to_64x13x8() {
        let cfg = DonkeyNetConfig::default();
        assert_eq!(cfg.conv_output_size(), Some((13, 8)));
        assert_eq!(cfg.flatten_dim(), Some(64 * 13 * 8));
    }

    #[test]
    fn too_small_input_is_rejected() {
        let cfg = DonkeyNetConfig {
            height: 40,
            width: 40,
            ..DonkeyNetConfig::default()
        };
        assert_eq!(cfg.flatten_dim(), None);
        assert!(DonkeyNet::<B>::new(cfg, &Default::default()).is_none());
    }

    #[test]
    fn forward_yields_two_outputs_per_image() {
        let device = Default::default();
        let cfg = DonkeyNetConfig {
            height: 64,
            width: 64,
            ..DonkeyNetConfig::default()
        };
        let model = DonkeyNet::<B>::new(cfg, &device).unwrap();
        let out = model.forward(Tensor::<B, 4>::zeros([3, 3, 64, 64], &device));
        assert_eq!(out.dims(), [3, 2]);
    }

    #[test]
    fn model_kind_names_artifacts() {
        assert_eq!(ModelKind::DonkeyNet.to_string(), "DonkeyNet");
    }
}
