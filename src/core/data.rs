// src/core/data.rs
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The task the assessed model solves. Drives error-column derivation and
/// statistics dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    Regression,
    Binary,
    Multiclass,
    ImageBinary,
    ImageMulticlass,
    ImageMultilabel,
    TextBinary,
    TextMulticlass,
    TextMultilabel,
    ObjectDetection,
    QuestionAnswering,
    Forecasting,
}

impl ModelType {
    pub fn is_regression(self) -> bool {
        matches!(self, ModelType::Regression | ModelType::Forecasting)
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            ModelType::Binary | ModelType::ImageBinary | ModelType::TextBinary
        )
    }

    pub fn is_multilabel(self) -> bool {
        matches!(self, ModelType::ImageMultilabel | ModelType::TextMultilabel)
    }

    /// Every task whose outcome columns hold class indexes.
    pub fn is_classification(self) -> bool {
        !self.is_regression() && self != ModelType::QuestionAnswering
    }
}

/// A raw cell as handed over by the dataset-loading side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(_) => None,
        }
    }

    pub fn as_cell(&self) -> CellValue<'_> {
        match self {
            RawValue::Number(n) => CellValue::Number(*n),
            RawValue::Text(s) => CellValue::Text(s),
        }
    }

    /// Numbers before text, numbers ascending, text lexicographic.
    pub fn total_cmp(&self, other: &RawValue) -> Ordering {
        match (self, other) {
            (RawValue::Number(a), RawValue::Number(b)) => a.total_cmp(b),
            (RawValue::Number(_), RawValue::Text(_)) => Ordering::Less,
            (RawValue::Text(_), RawValue::Number(_)) => Ordering::Greater,
            (RawValue::Text(a), RawValue::Text(b)) => a.cmp(b),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A borrowed cell read out of the row store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> CellValue<'a> {
    pub fn as_number(self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(n),
            CellValue::Text(_) => None,
        }
    }

    pub fn to_raw(self) -> RawValue {
        match self {
            CellValue::Number(n) => RawValue::Number(n),
            CellValue::Text(s) => RawValue::Text(s.to_string()),
        }
    }

    /// Numbers before text, numbers ascending, text lexicographic.
    pub fn total_cmp(self, other: CellValue<'_>) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(&b),
            (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
            (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
        }
    }

    pub fn matches_raw(self, raw: &RawValue) -> bool {
        match (self, raw) {
            (CellValue::Number(a), RawValue::Number(b)) => a == *b,
            (CellValue::Text(a), RawValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// Predictions or ground truth for every row.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    /// One class index (classification) or target value (regression) per row.
    Single(Vec<f64>),
    /// rows × labels, each entry 0 or 1.
    Multi(Array2<f64>),
    /// Free text answers (question answering).
    Text(Vec<String>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Single(v) => v.len(),
            Labels::Multi(m) => m.nrows(),
            Labels::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_labels(&self) -> usize {
        match self {
            Labels::Multi(m) => m.ncols(),
            _ => 1,
        }
    }
}

/// Everything the store is built from.
#[derive(Debug, Clone)]
pub struct DatasetInput {
    /// Row-major raw feature matrix.
    pub features: Vec<Vec<RawValue>>,
    pub feature_names: Vec<String>,
    pub categorical_features: Vec<bool>,
    /// Optional fixed category lists, indexed by feature column. Values not in
    /// the list are stored as category 0.
    pub categorical_map: Option<Vec<Option<Vec<RawValue>>>>,
    pub class_names: Option<Vec<String>>,
    pub predicted_y: Option<Labels>,
    pub true_y: Option<Labels>,
    /// rows × classes.
    pub probabilities: Option<Array2<f64>>,
    /// rows × features × classes; regression uses a class axis of length 1.
    pub local_explanations: Option<Array3<f64>>,
    pub model_type: ModelType,
}

impl DatasetInput {
    pub fn new(
        features: Vec<Vec<RawValue>>,
        feature_names: Vec<String>,
        categorical_features: Vec<bool>,
        model_type: ModelType,
    ) -> Self {
        DatasetInput {
            features,
            feature_names,
            categorical_features,
            categorical_map: None,
            class_names: None,
            predicted_y: None,
            true_y: None,
            probabilities: None,
            local_explanations: None,
            model_type,
        }
    }

    pub fn with_predicted_y(mut self, labels: Labels) -> Self {
        self.predicted_y = Some(labels);
        self
    }

    pub fn with_true_y(mut self, labels: Labels) -> Self {
        self.true_y = Some(labels);
        self
    }

    pub fn with_probabilities(mut self, probabilities: Array2<f64>) -> Self {
        self.probabilities = Some(probabilities);
        self
    }

    pub fn with_local_explanations(mut self, importances: Array3<f64>) -> Self {
        self.local_explanations = Some(importances);
        self
    }

    pub fn with_class_names(mut self, class_names: Vec<String>) -> Self {
        self.class_names = Some(class_names);
        self
    }

    pub fn with_categorical_map(mut self, map: Vec<Option<Vec<RawValue>>>) -> Self {
        self.categorical_map = Some(map);
        self
    }
}
