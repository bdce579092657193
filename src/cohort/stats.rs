// src/cohort/stats.rs
use crate::dataset::JointDataset;
use serde::{Deserialize, Serialize};

/// Correctness counts of a cohort next to those of the whole dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStats {
    pub total_all: usize,
    pub total_cohort: usize,
    pub total_correct: usize,
    pub total_incorrect: usize,
    pub total_cohort_correct: usize,
    pub total_cohort_incorrect: usize,
    /// Percentage of incorrect predictions in the cohort; 0 for an empty cohort.
    pub error_rate: f64,
}

impl CohortStats {
    /// Rows without both prediction and ground truth count towards the
    /// totals but are neither correct nor incorrect.
    pub fn compute(dataset: &JointDataset, selected: &[usize]) -> Self {
        let mut stats = CohortStats {
            total_all: dataset.row_count(),
            total_cohort: selected.len(),
            ..CohortStats::default()
        };
        for row in 0..dataset.row_count() {
            match dataset.prediction_is_correct(row) {
                Some(true) => stats.total_correct += 1,
                Some(false) => stats.total_incorrect += 1,
                None => {}
            }
        }
        for &row in selected {
            match dataset.prediction_is_correct(row) {
                Some(true) => stats.total_cohort_correct += 1,
                Some(false) => stats.total_cohort_incorrect += 1,
                None => {}
            }
        }
        if stats.total_cohort > 0 {
            stats.error_rate =
                100.0 * stats.total_cohort_incorrect as f64 / stats.total_cohort as f64;
        }
        stats
    }
}
