// src/dataset/config.rs
use crate::dataset::WeightVector;

/// Configuration for building a [`JointDataset`](crate::JointDataset).
#[derive(Debug, Clone)]
pub struct JointDatasetConfig {
    /// Strategy collapsing the class axis of the raw local importances.
    pub weight_vector: WeightVector,
    /// Bin count used when a numeric column is binned without an explicit count.
    pub default_bin_count: usize,
    /// Seeds the dither column; `None` draws from OS entropy.
    pub dither_seed: Option<u64>,
}

impl Default for JointDatasetConfig {
    fn default() -> Self {
        JointDatasetConfig {
            weight_vector: WeightVector::AbsAvg,
            default_bin_count: 5,
            dither_seed: None,
        }
    }
}
