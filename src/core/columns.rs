// src/core/columns.rs
use crate::core::CohortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const INDEX: &str = "Index";
const DITHER: &str = "Dither";
const DATA_ROOT: &str = "Data";
const PREDICTED_Y: &str = "PredictedY";
const TRUE_Y: &str = "TrueY";
const PROBABILITY_ROOT: &str = "ProbabilityClass";
const CLASSIFICATION_ERROR: &str = "ClassificationError";
const REGRESSION_ERROR: &str = "RegressionError";
const LOCAL_IMPORTANCE_ROOT: &str = "LocalImportance";

/// Key of a column in the joint row store.
///
/// Renders to (and parses from) the flat string names the presentation layer
/// uses, e.g. `Data3`, `PredictedY`, `TrueY1`, `ProbabilityClass0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnKey {
    Index,
    Dither,
    Data(usize),
    PredictedY,
    /// Multi-label prediction, one column per label.
    PredictedYLabel(usize),
    TrueY,
    TrueYLabel(usize),
    ProbabilityClass(usize),
    ClassificationError,
    RegressionError,
    LocalImportance(usize),
}

impl ColumnKey {
    /// Outcome columns store category indexes directly, without a raw value
    /// mapping.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            ColumnKey::PredictedY
                | ColumnKey::PredictedYLabel(_)
                | ColumnKey::TrueY
                | ColumnKey::TrueYLabel(_)
                | ColumnKey::ClassificationError
        )
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index => f.write_str(INDEX),
            ColumnKey::Dither => f.write_str(DITHER),
            ColumnKey::Data(i) => write!(f, "{}{}", DATA_ROOT, i),
            ColumnKey::PredictedY => f.write_str(PREDICTED_Y),
            ColumnKey::PredictedYLabel(k) => write!(f, "{}{}", PREDICTED_Y, k),
            ColumnKey::TrueY => f.write_str(TRUE_Y),
            ColumnKey::TrueYLabel(k) => write!(f, "{}{}", TRUE_Y, k),
            ColumnKey::ProbabilityClass(k) => write!(f, "{}{}", PROBABILITY_ROOT, k),
            ColumnKey::ClassificationError => f.write_str(CLASSIFICATION_ERROR),
            ColumnKey::RegressionError => f.write_str(REGRESSION_ERROR),
            ColumnKey::LocalImportance(i) => write!(f, "{}{}", LOCAL_IMPORTANCE_ROOT, i),
        }
    }
}

fn indexed_suffix(s: &str, root: &str) -> Option<usize> {
    let rest = s.strip_prefix(root)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

impl FromStr for ColumnKey {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            INDEX => ColumnKey::Index,
            DITHER => ColumnKey::Dither,
            PREDICTED_Y => ColumnKey::PredictedY,
            TRUE_Y => ColumnKey::TrueY,
            CLASSIFICATION_ERROR => ColumnKey::ClassificationError,
            REGRESSION_ERROR => ColumnKey::RegressionError,
            _ => {
                if let Some(i) = indexed_suffix(s, LOCAL_IMPORTANCE_ROOT) {
                    ColumnKey::LocalImportance(i)
                } else if let Some(k) = indexed_suffix(s, PROBABILITY_ROOT) {
                    ColumnKey::ProbabilityClass(k)
                } else if let Some(k) = indexed_suffix(s, PREDICTED_Y) {
                    ColumnKey::PredictedYLabel(k)
                } else if let Some(k) = indexed_suffix(s, TRUE_Y) {
                    ColumnKey::TrueYLabel(k)
                } else if let Some(i) = indexed_suffix(s, DATA_ROOT) {
                    ColumnKey::Data(i)
                } else {
                    return Err(CohortError::UnknownColumn(s.to_string()));
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = CohortError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnKey> for String {
    fn from(key: ColumnKey) -> Self {
        key.to_string()
    }
}

/// UI grouping a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnCategory {
    Outcome,
    Dataset,
    Index,
    Explanation,
    Cohort,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeType {
    Integer,
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
    pub range_type: RangeType,
}

impl FeatureRange {
    /// Range over finite values; `None` when there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<FeatureRange> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut all_integer = true;
        let mut seen = false;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            seen = true;
            min = min.min(v);
            max = max.max(v);
            all_integer &= v.fract() == 0.0;
        }
        if !seen {
            return None;
        }
        let range_type = if all_integer {
            RangeType::Integer
        } else {
            RangeType::Numeric
        };
        Some(FeatureRange {
            min,
            max,
            range_type,
        })
    }
}

/// Semantic descriptor of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub label: String,
    pub abbridged_label: String,
    pub category: ColumnCategory,
    pub is_categorical: bool,
    pub treat_as_categorical: bool,
    /// Position in this list is the stored value of a categorical column.
    pub sorted_categorical_values: Option<Vec<String>>,
    pub feature_range: Option<FeatureRange>,
    /// Position of the column in the source feature matrix.
    pub index: Option<usize>,
}

const ABBRIDGED_LABEL_LEN: usize = 15;

impl ColumnMeta {
    pub fn new(label: impl Into<String>, category: ColumnCategory) -> Self {
        let label = label.into();
        let abbridged_label = abbridge(&label);
        ColumnMeta {
            label,
            abbridged_label,
            category,
            is_categorical: false,
            treat_as_categorical: false,
            sorted_categorical_values: None,
            feature_range: None,
            index: None,
        }
    }

    pub fn categorical(mut self, values: Vec<String>) -> Self {
        self.is_categorical = true;
        self.treat_as_categorical = true;
        self.sorted_categorical_values = Some(values);
        self
    }

    pub fn with_range(mut self, range: Option<FeatureRange>) -> Self {
        self.feature_range = range;
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Whether filters treat stored values as category indexes.
    pub fn behaves_categorical(&self) -> bool {
        self.is_categorical || self.treat_as_categorical
    }
}

fn abbridge(label: &str) -> String {
    if label.chars().count() <= ABBRIDGED_LABEL_LEN {
        return label.to_string();
    }
    let mut short: String = label.chars().take(ABBRIDGED_LABEL_LEN - 3).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_keys_round_trip_through_strings() {
        let keys = [
            ColumnKey::Index,
            ColumnKey::Dither,
            ColumnKey::Data(12),
            ColumnKey::PredictedY,
            ColumnKey::PredictedYLabel(2),
            ColumnKey::TrueY,
            ColumnKey::TrueYLabel(0),
            ColumnKey::ProbabilityClass(3),
            ColumnKey::ClassificationError,
            ColumnKey::RegressionError,
            ColumnKey::LocalImportance(7),
        ];
        for key in keys {
            assert_eq!(key.to_string().parse::<ColumnKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_column_names_are_rejected() {
        for name in ["", "Data", "Datax", "age", "PredictedY-1", "ProbabilityClass"] {
            assert!(
                matches!(name.parse::<ColumnKey>(), Err(CohortError::UnknownColumn(_))),
                "{name:?} should not parse"
            );
        }
    }

    #[test]
    fn column_key_serializes_as_string() {
        let json = serde_json::to_string(&ColumnKey::Data(4)).unwrap();
        assert_eq!(json, "\"Data4\"");
        let key: ColumnKey = serde_json::from_str("\"TrueY1\"").unwrap();
        assert_eq!(key, ColumnKey::TrueYLabel(1));
    }

    #[test]
    fn feature_range_detects_integers() {
        let range = FeatureRange::from_values([3.0, 1.0, 7.0]).unwrap();
        assert_eq!(range.min, 1.0);
        assert_eq!(range.max, 7.0);
        assert_eq!(range.range_type, RangeType::Integer);

        let range = FeatureRange::from_values([0.5, 2.0]).unwrap();
        assert_eq!(range.range_type, RangeType::Numeric);

        assert!(FeatureRange::from_values([f64::NAN]).is_none());
    }

    #[test]
    fn long_labels_are_abbridged() {
        let meta = ColumnMeta::new("a very long feature name", ColumnCategory::Dataset);
        assert_eq!(meta.abbridged_label, "a very long ...");
        assert_eq!(meta.abbridged_label.chars().count(), 15);
    }
}
