//! Batch iteration for training and testing.

use crate::capture::DriveDataset;
use crate::types::{BurnDatasetError, DatasetResult};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::seq::SliceRandom;
use rand::Rng;

pub struct DriveBatch<B: Backend> {
    /// `[N, 3, H, W]` in [0, 1].
    pub images: Tensor<B, 4>,
    /// `[N, 2]`: steering, throttle.
    pub targets: Tensor<B, 2>,
}

/// Sequential minibatches over a fixed list of dataset indices.
///
/// The last batch is short when the index count is not a multiple of the
/// batch size; with fewer indices than the batch size there is exactly one batch.
pub struct BatchIter {
    indices: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    images_buf: Vec<f32>,
    targets_buf: Vec<f32>,
}

impl BatchIter {
    pub fn new(indices: Vec<usize>, batch_size: usize) -> Self {
        Self {
            indices,
            cursor: 0,
            batch_size: batch_size.max(1),
            images_buf: Vec::new(),
            targets_buf: Vec::new(),
        }
    }

    /// Number of samples covered per pass.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Rewind to the first batch, optionally reshuffling the order.
    pub fn reset<R: Rng + ?Sized>(&mut self, shuffle: Option<&mut R>) {
        if let Some(rng) = shuffle {
            self.indices.shuffle(rng);
        }
        self.cursor = 0;
    }

    pub fn next_batch<B: Backend>(
        &mut self,
        dataset: &DriveDataset,
        device: &B::Device,
    ) -> DatasetResult<Option<DriveBatch<B>>> {
        if self.cursor >= self.indices.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let slice = &self.indices[self.cursor..end];
        self.cursor = end;

        self.images_buf.clear();
        self.targets_buf.clear();
        let mut expected_size: Option<(u32, u32)> = None;
        for &index in slice {
            let sample = dataset.get(index)?;
            let size = (sample.width, sample.height);
            match expected_size {
                None => {
                    expected_size = Some(size);
                    let elems = slice.len() * sample.image_chw.len();
                    if self.images_buf.capacity() < elems {
                        self.images_buf.reserve(elems - self.images_buf.len());
                    }
                }
                Some(sz) if sz != size => {
                    return Err(BurnDatasetError::Other(format!(
                        "batch mixes image sizes {}x{} and {}x{}; set a target size",
                        sz.0, sz.1, size.0, size.1
                    )));
                }
                _ => {}
            }
            self.images_buf.extend_from_slice(&sample.image_chw);
            self.targets_buf.push(sample.steering);
            self.targets_buf.push(sample.throttle);
        }

        let Some((width, height)) = expected_size else {
            return Ok(None);
        };
        let n = slice.len();
        let images = Tensor::<B, 1>::from_floats(self.images_buf.as_slice(), device)
            .reshape([n, 3, height as usize, width as usize]);
        let targets =
            Tensor::<B, 1>::from_floats(self.targets_buf.as_slice(), device).reshape([n, 2]);
        Ok(Some(DriveBatch { images, targets }))
    }
}
