// src/metrics/image.rs
use crate::core::ColumnKey;
use crate::dataset::JointDataset;
use crate::metrics::{not_computed, LabeledStatistic, MetricKey};
use crate::utils::{f1, mean, safe_div};
use log::warn;
use std::collections::BTreeMap;

const KEYS: [MetricKey; 7] = [
    MetricKey::Accuracy,
    MetricKey::MacroPrecision,
    MetricKey::MacroRecall,
    MetricKey::MacroF1,
    MetricKey::MicroPrecision,
    MetricKey::MicroRecall,
    MetricKey::MicroF1,
];

/// One-vs-rest precision, recall and F1, averaged per class (macro) and over
/// pooled counts (micro).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MicroMacroMetrics {
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub micro_precision: f64,
    pub micro_recall: f64,
    pub micro_f1: f64,
}

#[derive(Default)]
struct ClassCounts {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
}

/// Classes are the distinct values seen in either the labels or the
/// predictions of the selected rows.
pub fn micro_macro_metrics(
    true_ys: &[f64],
    predicted_ys: &[f64],
    selection: &[usize],
) -> MicroMacroMetrics {
    let rows = true_ys.len().min(predicted_ys.len());
    let mut counts: BTreeMap<i64, ClassCounts> = BTreeMap::new();
    for &i in selection.iter().filter(|&&i| i < rows) {
        let (truth, predicted) = (true_ys[i] as i64, predicted_ys[i] as i64);
        if truth == predicted {
            counts.entry(truth).or_default().true_positive += 1;
        } else {
            counts.entry(predicted).or_default().false_positive += 1;
            counts.entry(truth).or_default().false_negative += 1;
        }
    }
    if counts.is_empty() {
        return MicroMacroMetrics::default();
    }

    let precisions: Vec<f64> = counts
        .values()
        .map(|c| safe_div(c.true_positive as f64, (c.true_positive + c.false_positive) as f64))
        .collect();
    let recalls: Vec<f64> = counts
        .values()
        .map(|c| safe_div(c.true_positive as f64, (c.true_positive + c.false_negative) as f64))
        .collect();

    let tp: usize = counts.values().map(|c| c.true_positive).sum();
    let fp: usize = counts.values().map(|c| c.false_positive).sum();
    let fn_: usize = counts.values().map(|c| c.false_negative).sum();
    let micro_precision = safe_div(tp as f64, (tp + fp) as f64);
    let micro_recall = safe_div(tp as f64, (tp + fn_) as f64);

    let macro_precision = mean(&precisions);
    let macro_recall = mean(&recalls);
    MicroMacroMetrics {
        macro_precision,
        macro_recall,
        macro_f1: f1(macro_precision, macro_recall),
        micro_precision,
        micro_recall,
        micro_f1: f1(micro_precision, micro_recall),
    }
}

pub fn image_stats(true_ys: &[f64], predicted_ys: &[f64], selection: &[usize]) -> Vec<LabeledStatistic> {
    let rows = true_ys.len().min(predicted_ys.len());
    let selected: Vec<usize> = selection.iter().copied().filter(|&i| i < rows).collect();
    let correct = selected
        .iter()
        .filter(|&&i| true_ys[i] == predicted_ys[i])
        .count();
    let m = micro_macro_metrics(true_ys, predicted_ys, &selected);

    vec![
        LabeledStatistic::count(selected.len()),
        LabeledStatistic::new(
            MetricKey::Accuracy,
            safe_div(correct as f64, selected.len() as f64),
        ),
        LabeledStatistic::new(MetricKey::MacroPrecision, m.macro_precision),
        LabeledStatistic::new(MetricKey::MacroRecall, m.macro_recall),
        LabeledStatistic::new(MetricKey::MacroF1, m.macro_f1),
        LabeledStatistic::new(MetricKey::MicroPrecision, m.micro_precision),
        LabeledStatistic::new(MetricKey::MicroRecall, m.micro_recall),
        LabeledStatistic::new(MetricKey::MicroF1, m.micro_f1),
    ]
}

pub(crate) fn image_stats_from_dataset(
    dataset: &JointDataset,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let columns = dataset
        .unwrap_numeric(ColumnKey::TrueY)
        .and_then(|t| Ok((t, dataset.unwrap_numeric(ColumnKey::PredictedY)?)));
    match columns {
        Ok((true_ys, predicted_ys)) => image_stats(&true_ys, &predicted_ys, selection),
        Err(e) => {
            warn!("Image classification statistics not computed: {}", e);
            not_computed(selection.len(), &KEYS)
        }
    }
}
