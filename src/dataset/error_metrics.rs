// src/dataset/error_metrics.rs
use crate::core::ModelType;

/// Outcome of a binary prediction, encoded as `2 * true + predicted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOutcome {
    TrueNegative = 0,
    FalsePositive = 1,
    FalseNegative = 2,
    TruePositive = 3,
}

impl BinaryOutcome {
    pub const LABELS: [&'static str; 4] = [
        "True negative",
        "False positive",
        "False negative",
        "True positive",
    ];

    pub fn from_code(code: f64) -> Option<BinaryOutcome> {
        match code as i64 {
            0 if code == 0.0 => Some(BinaryOutcome::TrueNegative),
            1 if code == 1.0 => Some(BinaryOutcome::FalsePositive),
            2 if code == 2.0 => Some(BinaryOutcome::FalseNegative),
            3 if code == 3.0 => Some(BinaryOutcome::TruePositive),
            _ => None,
        }
    }

    pub fn code(self) -> f64 {
        self as i64 as f64
    }
}

/// Outcome of a multiclass or multi-label prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MulticlassOutcome {
    Correct = 0,
    Misclassified = 1,
}

impl MulticlassOutcome {
    pub const LABELS: [&'static str; 2] = ["Correctly classified", "Misclassified"];

    pub fn from_misclassified(misclassified: bool) -> Self {
        if misclassified {
            MulticlassOutcome::Misclassified
        } else {
            MulticlassOutcome::Correct
        }
    }

    pub fn code(self) -> f64 {
        self as i64 as f64
    }
}

/// The derived error value of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorMetric {
    Regression(f64),
    Binary(BinaryOutcome),
    Multiclass(MulticlassOutcome),
    /// Binary code of labels outside `{0, 1}`.
    UnknownCode(f64),
}

impl ErrorMetric {
    /// The value stored in the error column.
    pub fn value(self) -> f64 {
        match self {
            ErrorMetric::Regression(v) => v,
            ErrorMetric::Binary(outcome) => outcome.code(),
            ErrorMetric::Multiclass(outcome) => outcome.code(),
            ErrorMetric::UnknownCode(code) => code,
        }
    }
}

/// Error value of one row; the slices hold one entry per label.
///
/// Binary codes are computed arithmetically, so labels outside `{0, 1}` yield
/// codes outside the four known outcomes.
pub fn error_metric(true_y: &[f64], predicted_y: &[f64], model_type: ModelType) -> ErrorMetric {
    let t = true_y.first().copied().unwrap_or(f64::NAN);
    let p = predicted_y.first().copied().unwrap_or(f64::NAN);
    if model_type.is_regression() {
        return ErrorMetric::Regression((t - p).abs());
    }
    if model_type.is_multilabel() {
        let misclassified = true_y.len() != predicted_y.len()
            || true_y.iter().zip(predicted_y).any(|(t, p)| t != p);
        return ErrorMetric::Multiclass(MulticlassOutcome::from_misclassified(misclassified));
    }
    if model_type.is_binary() {
        return match BinaryOutcome::from_code(2.0 * t + p) {
            Some(outcome) => ErrorMetric::Binary(outcome),
            None => ErrorMetric::UnknownCode(2.0 * t + p),
        };
    }
    ErrorMetric::Multiclass(MulticlassOutcome::from_misclassified(t != p))
}
