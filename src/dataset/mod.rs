pub mod binning;
pub mod config;
pub mod error_metrics;
pub mod joint_dataset;
pub mod local_importance;

pub use binning::Bins;
pub use config::JointDatasetConfig;
pub use error_metrics::{BinaryOutcome, ErrorMetric, MulticlassOutcome};
pub use joint_dataset::{ColumnData, JointDataset, RowView};
pub use local_importance::WeightVector;
