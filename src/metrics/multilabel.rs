// src/metrics/multilabel.rs
use crate::core::ColumnKey;
use crate::dataset::JointDataset;
use crate::metrics::{not_computed, LabeledStatistic, MetricKey};
use crate::utils::safe_div;
use log::warn;
use ndarray::{Array2, ArrayView2};

/// Exact match ratio and Hamming score over rows × labels 0/1 matrices.
///
/// The Hamming score of a row is |truth ∩ predicted| / |truth ∪ predicted|,
/// and 1 when both label sets are empty.
pub fn multilabel_stats(
    true_ys: ArrayView2<'_, f64>,
    predicted_ys: ArrayView2<'_, f64>,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let rows = true_ys.nrows().min(predicted_ys.nrows());
    let mut count = 0usize;
    let mut exact_matches = 0usize;
    let mut hamming_sum = 0.0;
    for &i in selection.iter().filter(|&&i| i < rows) {
        let truth = true_ys.row(i);
        let predicted = predicted_ys.row(i);
        let mut intersection = 0usize;
        let mut union = 0usize;
        let mut matches = truth.len() == predicted.len();
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            matches &= t == p;
            let (t, p) = (t != 0.0, p != 0.0);
            intersection += (t && p) as usize;
            union += (t || p) as usize;
        }
        count += 1;
        exact_matches += matches as usize;
        hamming_sum += if union == 0 {
            1.0
        } else {
            intersection as f64 / union as f64
        };
    }

    let n = count as f64;
    vec![
        LabeledStatistic::count(count),
        LabeledStatistic::new(MetricKey::ExactMatchRatio, safe_div(exact_matches as f64, n)),
        LabeledStatistic::new(MetricKey::HammingScore, safe_div(hamming_sum, n)),
    ]
}

/// Gathers the per-label outcome columns back into a rows × labels matrix.
fn label_matrix(
    dataset: &JointDataset,
    key: fn(usize) -> ColumnKey,
) -> crate::core::Result<Array2<f64>> {
    let labels = dataset.num_labels();
    let mut matrix = Array2::zeros((dataset.row_count(), labels));
    for k in 0..labels {
        for (row, value) in dataset.unwrap_numeric(key(k))?.into_iter().enumerate() {
            matrix[[row, k]] = value;
        }
    }
    Ok(matrix)
}

pub(crate) fn multilabel_stats_from_dataset(
    dataset: &JointDataset,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let matrices = label_matrix(dataset, ColumnKey::TrueYLabel)
        .and_then(|t| Ok((t, label_matrix(dataset, ColumnKey::PredictedYLabel)?)));
    match matrices {
        Ok((true_ys, predicted_ys)) => {
            multilabel_stats(true_ys.view(), predicted_ys.view(), selection)
        }
        Err(e) => {
            warn!("Multi-label statistics not computed: {}", e);
            not_computed(
                selection.len(),
                &[MetricKey::ExactMatchRatio, MetricKey::HammingScore],
            )
        }
    }
}
