// src/dataset/binning.rs
use crate::core::{FeatureRange, RangeType};
use crate::utils::format_significant;
use serde::{Deserialize, Serialize};

/// Contiguous intervals partitioning a numeric column's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bins {
    /// Inclusive upper bound of each bin, ascending.
    pub upper_bounds: Vec<f64>,
    /// Display label of each bin.
    pub labels: Vec<String>,
}

impl Bins {
    pub fn len(&self) -> usize {
        self.upper_bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper_bounds.is_empty()
    }

    pub fn index_of(&self, value: f64) -> Option<usize> {
        bin_index(&self.upper_bounds, value)
    }
}

/// Index of the first bound `>= value`.
pub fn bin_index(upper_bounds: &[f64], value: f64) -> Option<usize> {
    upper_bounds.iter().position(|&bound| bound >= value)
}

/// Bin count when none is requested: integer ranges never get more bins than
/// they have distinct values.
pub fn resolve_bin_count(
    range: &FeatureRange,
    requested: Option<usize>,
    default_count: usize,
    distinct_values: usize,
) -> usize {
    match requested {
        Some(count) => count,
        None if range.range_type == RangeType::Integer => default_count.min(distinct_values),
        None => default_count,
    }
}

pub fn compute_bins(range: &FeatureRange, bin_count: usize) -> Bins {
    let FeatureRange { min, max, range_type } = *range;
    let delta = max - min;

    if delta == 0.0 || bin_count == 0 {
        return Bins {
            upper_bounds: vec![max],
            labels: vec![range_label(min, max)],
        };
    }

    if range_type != RangeType::Integer || delta < (bin_count - 1) as f64 {
        let bin_delta = delta / bin_count as f64;
        let upper_bounds: Vec<f64> = (0..bin_count)
            .map(|i| {
                if i == bin_count - 1 {
                    max
                } else {
                    min + bin_delta * (i + 1) as f64
                }
            })
            .collect();
        let mut prev = min;
        let labels = upper_bounds
            .iter()
            .map(|&upper| {
                let label = range_label(prev, upper);
                prev = upper;
                label
            })
            .collect();
        return Bins { upper_bounds, labels };
    }

    // Integer bins: [min + step*i, min + step*(i+1) - 1], the last one closed at max.
    let step = (delta / bin_count as f64).floor().max(1.0);
    let lowers: Vec<f64> = (0..bin_count).map(|i| min + step * i as f64).collect();
    let upper_bounds: Vec<f64> = (0..bin_count)
        .map(|i| if i == bin_count - 1 { max } else { lowers[i + 1] - 1.0 })
        .collect();
    let labels = lowers
        .iter()
        .zip(&upper_bounds)
        .map(|(&lower, &upper)| {
            if lower == upper {
                format_significant(lower, 3)
            } else {
                range_label(lower, upper)
            }
        })
        .collect();
    Bins { upper_bounds, labels }
}

fn range_label(lower: f64, upper: f64) -> String {
    format!("{} - {}", format_significant(lower, 3), format_significant(upper, 3))
}
