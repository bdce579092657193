// src/metrics/cached.rs

//! Object-detection and question-answering scores are computed by the
//! backend; these generators only read them back.

use crate::metrics::{not_computed, LabeledStatistic, MetricKey};
use crate::traits::{ObjectDetectionCache, QuestionAnsweringCache};
use crate::utils::selection_signature;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const OBJECT_DETECTION_KEYS: [MetricKey; 3] = [
    MetricKey::MeanAveragePrecision,
    MetricKey::AveragePrecision,
    MetricKey::AverageRecall,
];

const QUESTION_ANSWERING_KEYS: [MetricKey; 6] = [
    MetricKey::ExactMatchRatio,
    MetricKey::F1Score,
    MetricKey::MeteorScore,
    MetricKey::BleuScore,
    MetricKey::BertScore,
    MetricKey::RougeScore,
];

/// Parameters the object-detection scores were computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetectionRequest {
    pub aggregate_method: String,
    pub class_name: String,
    pub iou_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetectionScores {
    pub mean_average_precision: f64,
    pub average_precision: f64,
    pub average_recall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnsweringScores {
    pub exact_match_ratio: f64,
    pub f1_score: f64,
    pub meteor_score: f64,
    pub bleu_score: f64,
    pub bert_score: f64,
    pub rouge_score: f64,
}

/// In-memory object-detection cache keyed by selection and request.
#[derive(Debug, Clone, Default)]
pub struct ObjectDetectionCacheMap {
    entries: HashMap<(String, String, String, u64), ObjectDetectionScores>,
}

impl ObjectDetectionCacheMap {
    pub fn new() -> Self {
        ObjectDetectionCacheMap::default()
    }

    fn key(selection: &[usize], request: &ObjectDetectionRequest) -> (String, String, String, u64) {
        (
            selection_signature(selection),
            request.aggregate_method.clone(),
            request.class_name.clone(),
            request.iou_threshold.to_bits(),
        )
    }

    pub fn insert(
        &mut self,
        selection: &[usize],
        request: &ObjectDetectionRequest,
        scores: ObjectDetectionScores,
    ) -> Option<ObjectDetectionScores> {
        self.entries.insert(Self::key(selection, request), scores)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ObjectDetectionCache for ObjectDetectionCacheMap {
    fn lookup(
        &self,
        selection: &[usize],
        request: &ObjectDetectionRequest,
    ) -> Option<ObjectDetectionScores> {
        self.entries.get(&Self::key(selection, request)).copied()
    }
}

/// In-memory question-answering cache keyed by selection.
#[derive(Debug, Clone, Default)]
pub struct QuestionAnsweringCacheMap {
    entries: HashMap<String, QuestionAnsweringScores>,
}

impl QuestionAnsweringCacheMap {
    pub fn new() -> Self {
        QuestionAnsweringCacheMap::default()
    }

    pub fn insert(
        &mut self,
        selection: &[usize],
        scores: QuestionAnsweringScores,
    ) -> Option<QuestionAnsweringScores> {
        self.entries.insert(selection_signature(selection), scores)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl QuestionAnsweringCache for QuestionAnsweringCacheMap {
    fn lookup(&self, selection: &[usize]) -> Option<QuestionAnsweringScores> {
        self.entries.get(&selection_signature(selection)).copied()
    }
}

pub fn object_detection_stats(
    cache: Option<(&dyn ObjectDetectionCache, &ObjectDetectionRequest)>,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    let scores = cache.and_then(|(cache, request)| cache.lookup(selection, request));
    match scores {
        Some(s) => vec![
            LabeledStatistic::count(selection.len()),
            LabeledStatistic::new(MetricKey::MeanAveragePrecision, s.mean_average_precision),
            LabeledStatistic::new(MetricKey::AveragePrecision, s.average_precision),
            LabeledStatistic::new(MetricKey::AverageRecall, s.average_recall),
        ],
        None => {
            warn!(
                "No object detection scores cached for selection [{}]",
                selection_signature(selection)
            );
            not_computed(selection.len(), &OBJECT_DETECTION_KEYS)
        }
    }
}

pub fn question_answering_stats(
    cache: Option<&dyn QuestionAnsweringCache>,
    selection: &[usize],
) -> Vec<LabeledStatistic> {
    match cache.and_then(|cache| cache.lookup(selection)) {
        Some(s) => vec![
            LabeledStatistic::count(selection.len()),
            LabeledStatistic::new(MetricKey::ExactMatchRatio, s.exact_match_ratio),
            LabeledStatistic::new(MetricKey::F1Score, s.f1_score),
            LabeledStatistic::new(MetricKey::MeteorScore, s.meteor_score),
            LabeledStatistic::new(MetricKey::BleuScore, s.bleu_score),
            LabeledStatistic::new(MetricKey::BertScore, s.bert_score),
            LabeledStatistic::new(MetricKey::RougeScore, s.rouge_score),
        ],
        None => {
            warn!(
                "No question answering scores cached for selection [{}]",
                selection_signature(selection)
            );
            not_computed(selection.len(), &QUESTION_ANSWERING_KEYS)
        }
    }
}
