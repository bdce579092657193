// src/lib.rs

//! `cohort_rs` is the data engine behind a model-assessment dashboard: a joint
//! row store over features, predictions, ground truth and local importances,
//! filter trees that carve it into cohorts, and per-cohort statistics.

// Declare the main modules of the crate
pub mod cohort;
pub mod core;
pub mod dataset;
pub mod filter;
pub mod metrics;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::cohort::{Cohort, CohortDefinition, CohortStats};
pub use crate::core::{
    CellValue, CohortError, ColumnKey, ColumnMeta, DatasetInput, Labels, ModelType, RawValue,
    Result,
};
pub use crate::dataset::{JointDataset, JointDatasetConfig, WeightVector};
pub use crate::filter::{ColumnRanges, CompositeFilter, Filter, FilterMethod, Operation};
pub use crate::metrics::{generate_metrics, LabeledStatistic, MetricCaches, MetricKey};
pub use crate::traits::{FilterContext, ObjectDetectionCache, QuestionAnsweringCache, RowAccess};

// Example of how a consumer drives the engine
/*
fn _example_usage() -> Result<()> {
    // 1. Hand over the raw dataset with predictions and labels
    let input = DatasetInput::new(features, feature_names, categorical_flags, ModelType::Binary)
        .with_true_y(Labels::Single(true_y))
        .with_predicted_y(Labels::Single(predicted_y));

    // 2. Build the joint row store
    let dataset = JointDataset::new(input, None)?;

    // 3. Carve out a cohort
    let cohort = Cohort::new(
        "Older than 40",
        &dataset,
        vec![Filter::new("age", FilterMethod::GreaterThan, vec![40.0])],
        Vec::new(),
        dataset.model_type(),
        None,
    );

    // 4. Read its statistics
    let stats = cohort.metrics(&dataset, &MetricCaches::default());
    Ok(())
}
*/
