use burn::backend::Autodiff;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use burn_dataset::{
    split_indices, summarize_run, validate_summary, BatchIter, DatasetConfig, DriveDataset,
    NoiseConfig, ValidationOutcome, ValidationThresholds,
};
use cli_support::{resolve_seed, DataRootArgs};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::metrics::LossHistory;
use crate::plot::plot_losses;
use crate::{DonkeyNet, DonkeyNetConfig, ModelKind, TrainBackend};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train DonkeyNet on one recorded run")]
pub struct TrainArgs {
    /// Run directory name under the data root (e.g. 2024_05_01_10_30).
    pub run: String,
    #[command(flatten)]
    pub data: DataRootArgs,
    /// Number of epochs.
    #[arg(long, default_value_t = 15)]
    pub epochs: usize,
    /// Learning rate.
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,
    /// Batch size.
    #[arg(long, default_value_t = 125)]
    pub batch_size: usize,
    /// Fraction of frames used for training; the rest is the test split.
    #[arg(long, default_value_t = 0.9)]
    pub train_ratio: f64,
    /// Seed for the split, shuffling and noise (falls back to BEARCART_SEED, then time).
    #[arg(long)]
    pub seed: Option<u64>,
    /// Add Gaussian pixel noise to every sample.
    #[arg(long, default_value_t = false)]
    pub noise: bool,
    /// Noise standard deviation in normalized pixel units.
    #[arg(long, default_value_t = 0.1)]
    pub noise_factor: f32,
    /// Width frames are resized to before entering the model.
    #[arg(long, default_value_t = 120)]
    pub width: u32,
    /// Height frames are resized to before entering the model.
    #[arg(long, default_value_t = 160)]
    pub height: u32,
    /// Reshuffle the training order every epoch.
    #[arg(long, default_value_t = false)]
    pub shuffle: bool,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
}

/// Files written into the run directory by [`run_train`].
#[derive(Debug, Clone)]
pub struct TrainArtifacts {
    pub weights: PathBuf,
    pub plot: PathBuf,
    pub losses: PathBuf,
    pub history: LossHistory,
}

type ADBackend = Autodiff<TrainBackend>;

pub fn run_train(args: TrainArgs) -> anyhow::Result<TrainArtifacts> {
    validate_backend_choice(args.backend)?;
    let device = <ADBackend as Backend>::Device::default();
    train_on::<ADBackend>(&args, &device)
}

fn train_on<B: AutodiffBackend>(
    args: &TrainArgs,
    device: &B::Device,
) -> anyhow::Result<TrainArtifacts> {
    if args.epochs == 0 {
        anyhow::bail!("--epochs must be at least 1");
    }
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }
    if !(0.0..=1.0).contains(&args.train_ratio) {
        anyhow::bail!("--train-ratio must be within [0, 1], got {}", args.train_ratio);
    }
    let run_dir = args.data.run_dir(&args.run);
    if !run_dir.is_dir() {
        let runs = args.data.list_runs();
        let known = if runs.is_empty() {
            "none".to_string()
        } else {
            runs.join(", ")
        };
        anyhow::bail!(
            "run directory {} does not exist (runs under {}: {known})",
            run_dir.display(),
            args.data.data_root.display()
        );
    }

    let report = validate_summary(summarize_run(&run_dir)?, &ValidationThresholds::from_env());
    for reason in &report.reasons {
        warn!("{}: {reason}", run_dir.display());
    }
    if report.outcome == ValidationOutcome::Fail {
        anyhow::bail!(
            "{} failed validation: {}",
            run_dir.display(),
            report.reasons.join("; ")
        );
    }

    let seed = resolve_seed(args.seed);
    info!("seed {seed}");
    let cfg = DatasetConfig {
        target_size: Some((args.width, args.height)),
        noise: args.noise.then_some(NoiseConfig {
            sigma: args.noise_factor,
            seed: Some(seed),
        }),
    };
    let mut dataset = DriveDataset::from_run_dir(&run_dir, cfg)?;
    if report.summary.missing_images > 0 {
        let dropped = dataset.retain_existing_images();
        warn!("skipping {dropped} rows whose image is missing");
    }
    info!("dataset {} has {} frames", run_dir.display(), dataset.len());
    if dataset.is_empty() {
        anyhow::bail!("{} has no labeled frames", run_dir.display());
    }

    let (train_idx, test_idx) = split_indices(dataset.len(), args.train_ratio, Some(seed));
    info!("train {} / test {}", train_idx.len(), test_idx.len());
    if train_idx.is_empty() {
        anyhow::bail!("train split is empty; raise --train-ratio");
    }
    if test_idx.is_empty() {
        warn!("test split is empty; only training loss will be reported");
    }

    let model_cfg = DonkeyNetConfig {
        height: args.height as usize,
        width: args.width as usize,
        ..DonkeyNetConfig::default()
    };
    let mut model = DonkeyNet::<B>::new(model_cfg, device).ok_or_else(|| {
        anyhow::anyhow!(
            "{}x{} is too small for {}",
            args.width,
            args.height,
            ModelKind::DonkeyNet
        )
    })?;
    let mut optim = AdamConfig::new().init();
    let mut shuffle_rng = StdRng::seed_from_u64(seed);

    let mut history = LossHistory {
        model: ModelKind::DonkeyNet.name().to_string(),
        epochs: args.epochs,
        lr: args.lr,
        batch_size: args.batch_size,
        seed,
        train_samples: train_idx.len(),
        test_samples: test_idx.len(),
        history: Vec::with_capacity(args.epochs),
    };
    let mut train_batches = BatchIter::new(train_idx, args.batch_size);
    let mut test_batches = BatchIter::new(test_idx, args.batch_size);

    for epoch in 1..=args.epochs {
        train_batches.reset(args.shuffle.then_some(&mut shuffle_rng));
        let (trained, train_loss) = train_epoch(
            model,
            &mut optim,
            args.lr,
            &mut train_batches,
            &dataset,
            device,
        )?;
        model = trained;

        test_batches.reset::<StdRng>(None);
        let test_loss = test_epoch(&model.valid(), &mut test_batches, &dataset, device)?;
        match test_loss {
            Some(t) => info!("epoch {epoch}/{}: train {train_loss:.4}, test {t:.4}", args.epochs),
            None => info!("epoch {epoch}/{}: train {train_loss:.4}", args.epochs),
        }
        history.push(train_loss, test_loss);
    }

    let stem = artifact_stem(ModelKind::DonkeyNet, args.epochs, args.lr);
    // burn rewrites the extension; keep `.bin` explicit so the lr's dot survives.
    let weights = run_dir.join(format!("{stem}.bin"));
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .save_file(weights.clone(), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", weights.display()))?;

    let plot = run_dir.join(format!("{stem}.png"));
    plot_losses(&plot, &stem, &history)?;
    let losses = run_dir.join(format!("{stem}.losses.json"));
    history.save_json(&losses)?;

    Ok(TrainArtifacts {
        weights,
        plot,
        losses,
        history,
    })
}

/// `<Model>-<epochs>epochs-<lr>lr`, shared by every artifact of one training run.
pub fn artifact_stem(kind: ModelKind, epochs: usize, lr: f64) -> String {
    format!("{}-{}epochs-{}lr", kind.name(), epochs, lr)
}

/// One pass over `batches` with an optimizer step per batch.
///
/// Returns the updated model and the running mean of the batch losses.
pub fn train_epoch<B, O>(
    mut model: DonkeyNet<B>,
    optim: &mut O,
    lr: f64,
    batches: &mut BatchIter,
    dataset: &DriveDataset,
    device: &B::Device,
) -> anyhow::Result<(DonkeyNet<B>, f32)>
where
    B: AutodiffBackend,
    O: Optimizer<DonkeyNet<B>, B>,
{
    let mse = MseLoss::new();
    let total = batches.len();
    let mut used = 0usize;
    let mut epoch_loss = 0.0f32;
    let mut b = 0usize;
    while let Some(batch) = batches.next_batch::<B>(dataset, device)? {
        used += batch.targets.dims()[0];
        let preds = model.forward(batch.images);
        let loss = mse.forward(preds, batch.targets, Reduction::Mean);
        let batch_loss = scalar(loss.clone());
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        epoch_loss = running_mean(epoch_loss, batch_loss, b);
        b += 1;
        info!("batch loss {batch_loss:.4} [{used}/{total}]");
    }
    Ok((model, epoch_loss))
}

/// Mean MSE over `batches` without gradients; `None` for an empty split.
pub fn test_epoch<B: Backend>(
    model: &DonkeyNet<B>,
    batches: &mut BatchIter,
    dataset: &DriveDataset,
    device: &B::Device,
) -> anyhow::Result<Option<f32>> {
    if batches.is_empty() {
        return Ok(None);
    }
    let mse = MseLoss::new();
    let mut epoch_loss = 0.0f32;
    let mut b = 0usize;
    while let Some(batch) = batches.next_batch::<B>(dataset, device)? {
        let preds = model.forward(batch.images);
        let batch_loss = scalar(mse.forward(preds, batch.targets, Reduction::Mean));
        epoch_loss = running_mean(epoch_loss, batch_loss, b);
        b += 1;
    }
    Ok(Some(epoch_loss))
}

/// Mean of `b + 1` values given the mean of the first `b` and the next value.
fn running_mean(mean: f32, next: f32, b: usize) -> f32 {
    (mean * b as f32 + next) / (b as f32 + 1.0)
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_scalar().elem::<f32>()
}

/// Rebuild a model from weights written by [`run_train`].
pub fn load_checkpoint<B: Backend>(
    path: &Path,
    cfg: DonkeyNetConfig,
    device: &B::Device,
) -> anyhow::Result<DonkeyNet<B>> {
    let model = DonkeyNet::<B>::new(cfg, device).ok_or_else(|| {
        anyhow::anyhow!("{}x{} is too small for the model", cfg.width, cfg.height)
    })?;
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", path.display()))
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            warn!("built with backend-wgpu; training will still use the WGPU backend despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_plain_mean() {
        let losses = [4.0f32, 2.0, 3.0, 7.0];
        let mut mean = 0.0;
        for (b, &l) in losses.iter().enumerate() {
            mean = running_mean(mean, l, b);
        }
        assert!((mean - 4.0).abs() < 1e-6);
    }

    #[test]
    fn stem_names_model_epochs_and_lr() {
        assert_eq!(
            artifact_stem(ModelKind::DonkeyNet, 15, 0.001),
            "DonkeyNet-15epochs-0.001lr"
        );
    }

    #[test]
    fn defaults_match_cli_contract() {
        let args = TrainArgs::parse_from(["train", "2024_05_01_10_30"]);
        assert_eq!(args.epochs, 15);
        assert_eq!(args.batch_size, 125);
        assert_eq!((args.width, args.height), (120, 160));
        assert!((args.lr - 0.001).abs() < f64::EPSILON);
        assert!((args.train_ratio - 0.9).abs() < f64::EPSILON);
        assert_eq!(args.data.data_root, PathBuf::from("data"));
        assert!(!args.noise && !args.shuffle);
    }

    #[test]
    fn missing_run_is_a_usage_error() {
        let err = TrainArgs::try_parse_from(["train"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
