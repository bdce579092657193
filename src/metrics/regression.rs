// src/metrics/regression.rs
use crate::core::ColumnKey;
use crate::dataset::JointDataset;
use crate::metrics::{not_computed, LabeledStatistic, MetricKey};
use crate::utils::{mean, safe_div};
use log::warn;

const KEYS: [MetricKey; 4] = [
    MetricKey::MeanAbsoluteError,
    MetricKey::MeanSquaredError,
    MetricKey::RSquared,
    MetricKey::MeanPrediction,
];

/// Regression statistics of the rows in `selection`.
///
/// R² compares the residuals of the selection against the spread around the
/// mean of *all* true values, so that cohorts are scored on a common scale.
/// It is 0 when that spread is 0. Indexes past the end are ignored.
pub fn regression_stats(
    true_ys: &[f64],
    predicted_ys: &[f64],
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let global_mean = mean(true_ys);
    let rows = true_ys.len().min(predicted_ys.len());

    let mut count = 0usize;
    let mut absolute_sum = 0.0;
    let mut residual_sum_of_squares = 0.0;
    let mut total_sum_of_squares = 0.0;
    let mut prediction_sum = 0.0;
    for &i in selection.iter().filter(|&&i| i < rows) {
        let residual = true_ys[i] - predicted_ys[i];
        count += 1;
        absolute_sum += residual.abs();
        residual_sum_of_squares += residual * residual;
        total_sum_of_squares += (true_ys[i] - global_mean).powi(2);
        prediction_sum += predicted_ys[i];
    }

    let n = count as f64;
    let r_squared = if total_sum_of_squares > 0.0 {
        1.0 - residual_sum_of_squares / total_sum_of_squares
    } else {
        0.0
    };
    vec![
        LabeledStatistic::count(count),
        LabeledStatistic::new(MetricKey::MeanAbsoluteError, safe_div(absolute_sum, n)),
        LabeledStatistic::new(MetricKey::MeanSquaredError, safe_div(residual_sum_of_squares, n)),
        LabeledStatistic::new(MetricKey::RSquared, r_squared),
        LabeledStatistic::new(MetricKey::MeanPrediction, safe_div(prediction_sum, n)),
    ]
}

pub(crate) fn regression_stats_from_dataset(
    dataset: &JointDataset,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let columns = dataset
        .unwrap_numeric(ColumnKey::TrueY)
        .and_then(|t| Ok((t, dataset.unwrap_numeric(ColumnKey::PredictedY)?)));
    match columns {
        Ok((true_ys, predicted_ys)) => regression_stats(&true_ys, &predicted_ys, selection),
        Err(e) => {
            warn!("Regression statistics not computed: {}", e);
            not_computed(selection.len(), &KEYS)
        }
    }
}
