// src/dataset/local_importance.rs
use crate::core::{CohortError, FeatureRange, RangeType, Result};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

/// Strategy collapsing per-class importances to one scalar per feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightVector {
    /// Mean over classes.
    Equal,
    /// Mean of absolute values over classes.
    AbsAvg,
    /// The importance towards one class.
    Class(usize),
}

/// Reduced importances (rows × features) and the per-feature value range.
#[derive(Debug, Clone)]
pub struct FlattenedImportance {
    pub values: Array2<f64>,
    pub ranges: Vec<FeatureRange>,
}

/// Collapses a rows × features × classes tensor along its class axis.
///
/// A single-class tensor (regression) always reads slot 0.
pub fn build_local_flatten_matrix(
    raw: &Array3<f64>,
    weight: WeightVector,
) -> Result<FlattenedImportance> {
    let (rows, features, classes) = raw.dim();
    if classes == 0 {
        return Err(CohortError::IncompatibleDimensions(
            "Local importances have an empty class axis.".to_string(),
        ));
    }

    let values: Array2<f64> = if classes == 1 {
        raw.index_axis(Axis(2), 0).to_owned()
    } else {
        match weight {
            WeightVector::Equal => raw.sum_axis(Axis(2)) / classes as f64,
            WeightVector::AbsAvg => raw.mapv(f64::abs).sum_axis(Axis(2)) / classes as f64,
            WeightVector::Class(k) if k < classes => raw.index_axis(Axis(2), k).to_owned(),
            WeightVector::Class(k) => {
                return Err(CohortError::InvalidInput(format!(
                    "Weight vector selects class {}, but importances carry {} classes.",
                    k, classes
                )))
            }
        }
    };

    let mut mins = vec![f64::MAX; features];
    let mut maxes = vec![f64::MIN; features];
    for row in values.rows() {
        for (f, &v) in row.iter().enumerate() {
            mins[f] = mins[f].min(v);
            maxes[f] = maxes[f].max(v);
        }
    }
    let ranges = mins
        .into_iter()
        .zip(maxes)
        .map(|(min, max)| {
            if rows == 0 {
                FeatureRange { min: 0.0, max: 0.0, range_type: RangeType::Numeric }
            } else {
                FeatureRange { min, max, range_type: RangeType::Numeric }
            }
        })
        .collect();

    Ok(FlattenedImportance { values, ranges })
}
