// src/metrics/classification.rs
use crate::core::ColumnKey;
use crate::dataset::{BinaryOutcome, JointDataset, MulticlassOutcome};
use crate::metrics::{not_computed, LabeledStatistic, MetricKey};
use crate::utils::{f1, safe_div};
use log::warn;

const BINARY_KEYS: [MetricKey; 7] = [
    MetricKey::Accuracy,
    MetricKey::Precision,
    MetricKey::Recall,
    MetricKey::FalseNegativeRate,
    MetricKey::FalsePositiveRate,
    MetricKey::SelectionRate,
    MetricKey::F1Score,
];

/// Confusion counts of a binary selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryConfusion {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl BinaryConfusion {
    /// Counts the outcome codes of the selected rows. Unknown codes count
    /// towards the total only.
    pub fn from_outcomes(outcomes: &[f64], selection: &[usize]) -> (Self, usize) {
        let mut confusion = BinaryConfusion::default();
        let mut total = 0;
        for &i in selection.iter().filter(|&&i| i < outcomes.len()) {
            total += 1;
            match BinaryOutcome::from_code(outcomes[i]) {
                Some(BinaryOutcome::TrueNegative) => confusion.true_negative += 1,
                Some(BinaryOutcome::FalsePositive) => confusion.false_positive += 1,
                Some(BinaryOutcome::FalseNegative) => confusion.false_negative += 1,
                Some(BinaryOutcome::TruePositive) => confusion.true_positive += 1,
                None => {}
            }
        }
        (confusion, total)
    }

    pub fn precision(&self) -> f64 {
        let tp = self.true_positive as f64;
        safe_div(tp, tp + self.false_positive as f64)
    }

    pub fn recall(&self) -> f64 {
        let tp = self.true_positive as f64;
        safe_div(tp, tp + self.false_negative as f64)
    }

    pub fn false_positive_rate(&self) -> f64 {
        let fp = self.false_positive as f64;
        safe_div(fp, fp + self.true_negative as f64)
    }

    pub fn false_negative_rate(&self) -> f64 {
        let fn_ = self.false_negative as f64;
        safe_div(fn_, fn_ + self.true_positive as f64)
    }
}

/// Binary statistics from the per-row outcome codes. The selection rate is
/// the share of rows predicted positive.
pub fn binary_stats(outcomes: &[f64], selection: &[usize]) -> Vec<LabeledStatistic> {
    let (confusion, total) = BinaryConfusion::from_outcomes(outcomes, selection);
    let n = total as f64;
    let precision = confusion.precision();
    let recall = confusion.recall();
    let predicted_positive = (confusion.true_positive + confusion.false_positive) as f64;
    let correct = (confusion.true_positive + confusion.true_negative) as f64;

    vec![
        LabeledStatistic::count(total),
        LabeledStatistic::new(MetricKey::Accuracy, safe_div(correct, n)),
        LabeledStatistic::new(MetricKey::Precision, precision),
        LabeledStatistic::new(MetricKey::Recall, recall),
        LabeledStatistic::new(MetricKey::FalseNegativeRate, confusion.false_negative_rate()),
        LabeledStatistic::new(MetricKey::FalsePositiveRate, confusion.false_positive_rate()),
        LabeledStatistic::new(MetricKey::SelectionRate, safe_div(predicted_positive, n)),
        LabeledStatistic::new(MetricKey::F1Score, f1(precision, recall)),
    ]
}

/// Share of selected rows whose outcome code is "correctly classified".
pub fn multiclass_stats(outcomes: &[f64], selection: &[usize]) -> Vec<LabeledStatistic> {
    let selected: Vec<f64> = selection
        .iter()
        .filter_map(|&i| outcomes.get(i).copied())
        .collect();
    let correct = selected
        .iter()
        .filter(|&&code| code == MulticlassOutcome::Correct.code())
        .count();
    vec![
        LabeledStatistic::count(selected.len()),
        LabeledStatistic::new(
            MetricKey::Accuracy,
            safe_div(correct as f64, selected.len() as f64),
        ),
    ]
}

fn outcome_codes(dataset: &JointDataset) -> Option<Vec<f64>> {
    match dataset.unwrap_numeric(ColumnKey::ClassificationError) {
        Ok(codes) => Some(codes),
        Err(e) => {
            warn!("Classification statistics not computed: {}", e);
            None
        }
    }
}

pub(crate) fn binary_stats_from_dataset(
    dataset: &JointDataset,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    match outcome_codes(dataset) {
        Some(codes) => binary_stats(&codes, selection),
        None => not_computed(selection.len(), &BINARY_KEYS),
    }
}

pub(crate) fn multiclass_stats_from_dataset(
    dataset: &JointDataset,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    match outcome_codes(dataset) {
        Some(codes) => multiclass_stats(&codes, selection),
        None => not_computed(selection.len(), &[MetricKey::Accuracy]),
    }
}
