//! Per-epoch loss history, persisted next to the weights.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLosses {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train: f32,
    /// `None` when the test split is empty.
    pub test: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub model: String,
    pub epochs: usize,
    pub lr: f64,
    pub batch_size: usize,
    pub seed: u64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub history: Vec<EpochLosses>,
}

impl LossHistory {
    pub fn push(&mut self, train: f32, test: Option<f32>) {
        let epoch = self.history.len() + 1;
        self.history.push(EpochLosses { epoch, train, test });
    }

    pub fn train_curve(&self) -> Vec<(f64, f64)> {
        self.history
            .iter()
            .map(|e| (e.epoch as f64, e.train as f64))
            .collect()
    }

    /// Test losses of the epochs that had a test split.
    pub fn test_curve(&self) -> Vec<(f64, f64)> {
        self.history
            .iter()
            .filter_map(|e| e.test.map(|t| (e.epoch as f64, t as f64)))
            .collect()
    }

    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> LossHistory {
        LossHistory {
            model: "DonkeyNet".into(),
            epochs: 2,
            lr: 0.001,
            batch_size: 125,
            seed: 7,
            train_samples: 9,
            test_samples: 1,
            history: Vec::new(),
        }
    }

    #[test]
    fn curves_number_epochs_from_one_and_skip_missing_test() {
        let mut h = history();
        h.push(2.0, None);
        h.push(1.5, Some(1.75));
        assert_eq!(h.train_curve(), vec![(1.0, 2.0), (2.0, 1.5)]);
        assert_eq!(h.test_curve(), vec![(2.0, 1.75)]);
    }

    #[test]
    fn json_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("losses.json");
        let mut h = history();
        h.push(0.5, Some(0.25));
        h.save_json(&path).unwrap();
        assert_eq!(LossHistory::load_json(&path).unwrap(), h);
    }
}
