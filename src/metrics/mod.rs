// src/metrics/mod.rs

//! Per-selection statistics, dispatched on the model type.
//!
//! Every generator returns the sample count first. Missing columns and
//! missing backend caches yield statistics whose `stat` is `None`.

pub mod cached;
pub mod classification;
pub mod image;
pub mod multilabel;
pub mod regression;

pub use cached::{
    ObjectDetectionCacheMap, ObjectDetectionRequest, ObjectDetectionScores,
    QuestionAnsweringCacheMap, QuestionAnsweringScores,
};
pub use image::{micro_macro_metrics, MicroMacroMetrics};

use crate::core::ModelType;
use crate::dataset::JointDataset;
use crate::traits::{ObjectDetectionCache, QuestionAnsweringCache};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    Count,
    Accuracy,
    Precision,
    Recall,
    F1Score,
    FalsePositiveRate,
    FalseNegativeRate,
    SelectionRate,
    MeanAbsoluteError,
    MeanSquaredError,
    RSquared,
    MeanPrediction,
    ExactMatchRatio,
    HammingScore,
    MacroPrecision,
    MacroRecall,
    MacroF1,
    MicroPrecision,
    MicroRecall,
    MicroF1,
    MeanAveragePrecision,
    AveragePrecision,
    AverageRecall,
    MeteorScore,
    BleuScore,
    BertScore,
    RougeScore,
}

impl MetricKey {
    pub fn label(self) -> &'static str {
        match self {
            MetricKey::Count => "samples",
            MetricKey::Accuracy => "accuracy",
            MetricKey::Precision => "precision",
            MetricKey::Recall => "recall",
            MetricKey::F1Score => "F1 score",
            MetricKey::FalsePositiveRate => "false positive rate",
            MetricKey::FalseNegativeRate => "false negative rate",
            MetricKey::SelectionRate => "selection rate",
            MetricKey::MeanAbsoluteError => "mean absolute error",
            MetricKey::MeanSquaredError => "mean squared error",
            MetricKey::RSquared => "R²",
            MetricKey::MeanPrediction => "mean prediction",
            MetricKey::ExactMatchRatio => "exact match ratio",
            MetricKey::HammingScore => "Hamming score",
            MetricKey::MacroPrecision => "macro precision",
            MetricKey::MacroRecall => "macro recall",
            MetricKey::MacroF1 => "macro F1 score",
            MetricKey::MicroPrecision => "micro precision",
            MetricKey::MicroRecall => "micro recall",
            MetricKey::MicroF1 => "micro F1 score",
            MetricKey::MeanAveragePrecision => "mean average precision",
            MetricKey::AveragePrecision => "average precision",
            MetricKey::AverageRecall => "average recall",
            MetricKey::MeteorScore => "METEOR score",
            MetricKey::BleuScore => "BLEU score",
            MetricKey::BertScore => "BERT score",
            MetricKey::RougeScore => "ROUGE score",
        }
    }
}

/// One named statistic. `stat` is `None` when it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStatistic {
    pub key: MetricKey,
    pub label: String,
    pub stat: Option<f64>,
}

impl LabeledStatistic {
    pub fn new(key: MetricKey, stat: f64) -> Self {
        LabeledStatistic {
            key,
            label: key.label().to_string(),
            stat: Some(stat),
        }
    }

    pub fn not_computed(key: MetricKey) -> Self {
        LabeledStatistic {
            key,
            label: key.label().to_string(),
            stat: None,
        }
    }

    pub(crate) fn count(count: usize) -> Self {
        LabeledStatistic::new(MetricKey::Count, count as f64)
    }
}

/// Sample count followed by `keys`, none of them computed.
pub(crate) fn not_computed(count: usize, keys: &[MetricKey]) -> Vec<LabeledStatistic> {
    std::iter::once(LabeledStatistic::count(count))
        .chain(keys.iter().map(|&key| LabeledStatistic::not_computed(key)))
        .collect()
}

/// Returns the first statistic under `key`.
pub fn find(stats: &[LabeledStatistic], key: MetricKey) -> Option<&LabeledStatistic> {
    stats.iter().find(|s| s.key == key)
}

/// Backend-computed scores for the tasks whose metrics are not derived
/// locally.
#[derive(Clone, Copy, Default)]
pub struct MetricCaches<'a> {
    pub object_detection: Option<(&'a dyn ObjectDetectionCache, &'a ObjectDetectionRequest)>,
    pub question_answering: Option<&'a dyn QuestionAnsweringCache>,
}

/// One list of statistics per selection of row indexes.
pub fn generate_metrics(
    dataset: &JointDataset,
    selections: &[Vec<usize>],
    model_type: ModelType,
    caches: &MetricCaches<'_>,
) -> Vec<Vec<LabeledStatistic>> {
    selections
        .iter()
        .map(|selection| selection_metrics(dataset, selection, model_type, caches))
        .collect()
}

fn selection_metrics(
    dataset: &JointDataset,
    selection: &[usize],
    model_type: ModelType,
    caches: &MetricCaches<'_>,
) -> Vec<LabeledStatistic> {
    match model_type {
        ModelType::ImageMultilabel | ModelType::TextMultilabel => {
            multilabel::multilabel_stats_from_dataset(dataset, selection)
        }
        ModelType::QuestionAnswering => {
            cached::question_answering_stats(caches.question_answering, selection)
        }
        ModelType::Regression | ModelType::Forecasting => {
            regression::regression_stats_from_dataset(dataset, selection)
        }
        ModelType::ImageMulticlass => image::image_stats_from_dataset(dataset, selection),
        ModelType::ObjectDetection => {
            cached::object_detection_stats(caches.object_detection, selection)
        }
        ModelType::Binary | ModelType::ImageBinary | ModelType::TextBinary => {
            classification::binary_stats_from_dataset(dataset, selection)
        }
        ModelType::Multiclass | ModelType::TextMulticlass => {
            classification::multiclass_stats_from_dataset(dataset, selection)
        }
    }
}
