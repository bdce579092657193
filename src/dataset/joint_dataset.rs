// src/dataset/joint_dataset.rs

use crate::core::{
    CellValue, CohortError, ColumnCategory, ColumnKey, ColumnMeta, DatasetInput, FeatureRange,
    Labels, ModelType, RawValue, Result,
};
use crate::dataset::binning::{compute_bins, resolve_bin_count, Bins};
use crate::dataset::error_metrics::{error_metric, BinaryOutcome, MulticlassOutcome};
use crate::dataset::local_importance::{self, WeightVector};
use crate::dataset::JointDatasetConfig;
use crate::traits::{CategoricalValues, FilterContext, RowAccess};
use log::{debug, warn};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, row: usize) -> Option<CellValue<'_>> {
        match self {
            ColumnData::Numeric(v) => v.get(row).map(|&n| CellValue::Number(n)),
            ColumnData::Text(v) => v.get(row).map(|s| CellValue::Text(s)),
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }
}

/// Representation state of a column.
#[derive(Debug, Clone)]
enum Treatment {
    /// Intrinsically categorical, text, or synthetic; never rewritten.
    Fixed,
    /// Raw numeric values; can be binned or treated as categorical.
    Numeric,
    /// Numeric column rewritten to category indexes. The cache restores it.
    Categorical { numeric_cache: Vec<f64> },
}

#[derive(Debug, Clone)]
struct Column {
    data: ColumnData,
    meta: ColumnMeta,
    treatment: Treatment,
}

/// Unified row store over features, predictions, ground truth, probabilities
/// and reduced local importances.
#[derive(Debug, Clone)]
pub struct JointDataset {
    columns: BTreeMap<ColumnKey, Column>,
    bins: HashMap<ColumnKey, Bins>,
    row_count: usize,
    model_type: ModelType,
    feature_names: Vec<String>,
    num_labels: usize,
    prediction_class_count: usize,
    raw_local_importance: Option<Array3<f64>>,
    local_importance: Option<Array2<f64>>,
    weight_vector: WeightVector,
    config: JointDatasetConfig,
}

impl JointDataset {
    pub fn new(input: DatasetInput, config: Option<JointDatasetConfig>) -> Result<Self> {
        validate(&input)?;
        let config = config.unwrap_or_default();

        let DatasetInput {
            features,
            feature_names,
            categorical_features,
            categorical_map,
            class_names,
            predicted_y,
            true_y,
            probabilities,
            local_explanations,
            model_type,
        } = input;

        let row_count = features.len();
        let num_labels = predicted_y
            .as_ref()
            .or(true_y.as_ref())
            .map(Labels::num_labels)
            .unwrap_or(1);
        let class_labels = if model_type.is_classification() {
            class_labels(
                class_names,
                [predicted_y.as_ref(), true_y.as_ref()],
                probabilities.as_ref(),
            )
        } else {
            class_names.unwrap_or_default()
        };

        let mut dataset = JointDataset {
            columns: BTreeMap::new(),
            bins: HashMap::new(),
            row_count,
            model_type,
            feature_names,
            num_labels,
            prediction_class_count: if model_type.is_classification() { class_labels.len() } else { 0 },
            raw_local_importance: None,
            local_importance: None,
            weight_vector: config.weight_vector,
            config,
        };

        dataset.insert_synthetic_columns();
        dataset.insert_feature_columns(&features, &categorical_features, categorical_map.as_deref());
        if let Some(labels) = &predicted_y {
            dataset.insert_outcome_columns(labels, "Predicted Y", true, &class_labels);
        }
        if let Some(labels) = &true_y {
            dataset.insert_outcome_columns(labels, "True Y", false, &class_labels);
        }
        if let Some(probabilities) = &probabilities {
            dataset.insert_probability_columns(probabilities, &class_labels);
        }
        if let (Some(predicted), Some(truth)) = (&predicted_y, &true_y) {
            dataset.set_error_metrics(predicted, truth)?;
        }
        if let Some(raw) = local_explanations {
            dataset.raw_local_importance = Some(raw);
            dataset.build_local_flatten_matrix(dataset.config.weight_vector)?;
        }
        dataset.add_default_bins()?;

        debug!(
            "built joint dataset: {} rows, {} columns, model type {:?}",
            dataset.row_count,
            dataset.columns.len(),
            dataset.model_type
        );
        Ok(dataset)
    }

    fn insert_column(&mut self, key: ColumnKey, data: ColumnData, meta: ColumnMeta, treatment: Treatment) {
        self.columns.insert(key, Column { data, meta, treatment });
    }

    fn insert_synthetic_columns(&mut self) {
        let index: Vec<f64> = (0..self.row_count).map(|i| i as f64).collect();
        let range = FeatureRange::from_values(index.iter().copied());
        self.insert_column(
            ColumnKey::Index,
            ColumnData::Numeric(index),
            ColumnMeta::new("Index", ColumnCategory::Index).with_range(range),
            Treatment::Fixed,
        );

        let mut rng = match self.config.dither_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let jitter = Uniform::new(-0.1f64, 0.1);
        let dither: Vec<f64> = (0..self.row_count).map(|_| jitter.sample(&mut rng)).collect();
        self.insert_column(
            ColumnKey::Dither,
            ColumnData::Numeric(dither),
            ColumnMeta::new("Dither", ColumnCategory::None),
            Treatment::Fixed,
        );
    }

    fn insert_feature_columns(
        &mut self,
        features: &[Vec<RawValue>],
        categorical_features: &[bool],
        categorical_map: Option<&[Option<Vec<RawValue>>]>,
    ) {
        for col in 0..self.feature_names.len() {
            let name = self.feature_names[col].clone();
            let raw: Vec<&RawValue> = features.iter().map(|row| &row[col]).collect();
            let meta = ColumnMeta::new(name.as_str(), ColumnCategory::Dataset).with_index(col);

            if categorical_features[col] {
                let fixed = categorical_map
                    .and_then(|map| map.get(col))
                    .and_then(|values| values.as_deref());
                let (indexes, categories, unknown) = categorize(&raw, fixed);
                if unknown > 0 {
                    warn!(
                        "feature {:?}: {} values missing from the categorical map were stored as category 0",
                        name, unknown
                    );
                }
                let labels = categories.iter().map(|c| c.to_string()).collect();
                self.insert_column(
                    ColumnKey::Data(col),
                    ColumnData::Numeric(indexes),
                    meta.categorical(labels),
                    Treatment::Fixed,
                );
            } else if let Some(numbers) = raw.iter().map(|v| v.as_number()).collect::<Option<Vec<f64>>>() {
                let range = FeatureRange::from_values(numbers.iter().copied());
                self.insert_column(
                    ColumnKey::Data(col),
                    ColumnData::Numeric(numbers),
                    meta.with_range(range),
                    Treatment::Numeric,
                );
            } else {
                let text = raw.iter().map(|v| v.to_string()).collect();
                self.insert_column(ColumnKey::Data(col), ColumnData::Text(text), meta, Treatment::Fixed);
            }
        }
    }

    fn insert_outcome_columns(
        &mut self,
        labels: &Labels,
        title: &str,
        predicted: bool,
        class_labels: &[String],
    ) {
        let (key, label_key): (ColumnKey, fn(usize) -> ColumnKey) = if predicted {
            (ColumnKey::PredictedY, ColumnKey::PredictedYLabel)
        } else {
            (ColumnKey::TrueY, ColumnKey::TrueYLabel)
        };

        match labels {
            Labels::Single(values) if self.model_type.is_classification() => {
                let meta = ColumnMeta::new(title, ColumnCategory::Outcome).categorical(class_labels.to_vec());
                self.insert_column(key, ColumnData::Numeric(values.clone()), meta, Treatment::Fixed);
            }
            Labels::Single(values) => {
                let range = FeatureRange::from_values(values.iter().copied());
                let meta = ColumnMeta::new(title, ColumnCategory::Outcome).with_range(range);
                self.insert_column(key, ColumnData::Numeric(values.clone()), meta, Treatment::Numeric);
            }
            Labels::Multi(matrix) => {
                for (k, column) in matrix.columns().into_iter().enumerate() {
                    let name = class_labels.get(k).cloned().unwrap_or_else(|| k.to_string());
                    let meta = ColumnMeta::new(format!("{} {}", title, name), ColumnCategory::Outcome)
                        .categorical(vec!["0".to_string(), "1".to_string()])
                        .with_index(k);
                    self.insert_column(label_key(k), ColumnData::Numeric(column.to_vec()), meta, Treatment::Fixed);
                }
            }
            Labels::Text(values) => {
                let meta = ColumnMeta::new(title, ColumnCategory::Outcome);
                self.insert_column(key, ColumnData::Text(values.clone()), meta, Treatment::Fixed);
            }
        }
    }

    fn insert_probability_columns(&mut self, probabilities: &Array2<f64>, class_labels: &[String]) {
        for (k, column) in probabilities.columns().into_iter().enumerate() {
            let values = column.to_vec();
            let name = class_labels.get(k).cloned().unwrap_or_else(|| k.to_string());
            let meta = ColumnMeta::new(format!("Probability: {}", name), ColumnCategory::Outcome)
                .with_range(FeatureRange::from_values(values.iter().copied()))
                .with_index(k);
            self.insert_column(ColumnKey::ProbabilityClass(k), ColumnData::Numeric(values), meta, Treatment::Numeric);
        }
    }

    fn set_error_metrics(&mut self, predicted: &Labels, truth: &Labels) -> Result<()> {
        let model_type = self.model_type;
        let codes: Vec<f64> = match (truth, predicted) {
            (Labels::Single(t), Labels::Single(p)) => t
                .iter()
                .zip(p)
                .map(|(&t, &p)| error_metric(&[t], &[p], model_type).value())
                .collect(),
            (Labels::Multi(t), Labels::Multi(p)) => t
                .rows()
                .into_iter()
                .zip(p.rows())
                .map(|(t, p)| error_metric(&t.to_vec(), &p.to_vec(), model_type).value())
                .collect(),
            (Labels::Text(t), Labels::Text(p)) => t
                .iter()
                .zip(p)
                .map(|(t, p)| MulticlassOutcome::from_misclassified(t != p).code())
                .collect(),
            _ => {
                return Err(CohortError::InvalidInput(
                    "Predicted and true labels must have the same shape.".to_string(),
                ))
            }
        };

        if model_type.is_regression() && matches!(truth, Labels::Single(_)) {
            let range = FeatureRange::from_values(codes.iter().copied());
            let meta = ColumnMeta::new("Regression error", ColumnCategory::Outcome).with_range(range);
            self.insert_column(ColumnKey::RegressionError, ColumnData::Numeric(codes), meta, Treatment::Numeric);
            return Ok(());
        }

        let labels: Vec<String> = if model_type.is_binary() && matches!(truth, Labels::Single(_)) {
            if codes.iter().any(|&c| BinaryOutcome::from_code(c).is_none()) {
                warn!("binary labels outside {{0, 1}} produced unknown outcome codes");
            }
            BinaryOutcome::LABELS.iter().map(|s| s.to_string()).collect()
        } else {
            MulticlassOutcome::LABELS.iter().map(|s| s.to_string()).collect()
        };
        let meta = ColumnMeta::new("Classification outcome", ColumnCategory::Outcome).categorical(labels);
        self.insert_column(ColumnKey::ClassificationError, ColumnData::Numeric(codes), meta, Treatment::Fixed);
        Ok(())
    }

    /// Re-reduces the raw local importances with another weighting strategy,
    /// rewriting every `LocalImportance{i}` column.
    pub fn build_local_flatten_matrix(&mut self, weight: WeightVector) -> Result<()> {
        let flat = match &self.raw_local_importance {
            Some(raw) => local_importance::build_local_flatten_matrix(raw, weight)?,
            None => return Ok(()),
        };

        for (f, range) in flat.ranges.iter().enumerate() {
            let key = ColumnKey::LocalImportance(f);
            let label = match self.feature_names.get(f) {
                Some(name) => format!("Importance: {}", name),
                None => format!("Importance: feature {}", f),
            };
            let meta = ColumnMeta::new(label, ColumnCategory::Explanation)
                .with_range(Some(*range))
                .with_index(f);
            self.insert_column(key, ColumnData::Numeric(flat.values.column(f).to_vec()), meta, Treatment::Numeric);
            self.add_bin(key, None)?;
        }
        debug!("reduced local importances with {:?}", weight);
        self.local_importance = Some(flat.values);
        self.weight_vector = weight;
        Ok(())
    }

    fn add_default_bins(&mut self) -> Result<()> {
        let keys: Vec<ColumnKey> = self
            .columns
            .iter()
            .filter(|(key, column)| {
                matches!(column.treatment, Treatment::Numeric)
                    && column.meta.feature_range.is_some()
                    && !self.bins.contains_key(key)
            })
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.add_bin(key, None)?;
        }
        Ok(())
    }

    /// Partitions a numeric column's range into labeled bins.
    pub fn add_bin(&mut self, key: ColumnKey, bin_count: Option<usize>) -> Result<&Bins> {
        let column = self.column_entry(key)?;
        if !matches!(column.treatment, Treatment::Numeric) {
            return Err(CohortError::InvalidOperation(format!(
                "Column {} is not a raw numeric column and cannot be binned.",
                key
            )));
        }
        let range = column.meta.feature_range.ok_or_else(|| {
            CohortError::InvalidOperation(format!("Column {} has no value range.", key))
        })?;
        let distinct = column.data.as_numeric().map(count_distinct).unwrap_or(0);
        let count = resolve_bin_count(&range, bin_count, self.config.default_bin_count, distinct);
        let bins = compute_bins(&range, count);
        debug!("binned {} into {} bins", key, bins.len());
        self.bins.insert(key, bins);
        Ok(&self.bins[&key])
    }

    /// Toggles whether a numeric dataset feature behaves as categorical.
    ///
    /// Enabling rewrites every value to its index among the sorted distinct
    /// values; disabling restores the exact numeric values and re-bins.
    pub fn set_treat_as_categorical(&mut self, key: ColumnKey, treat: bool) -> Result<()> {
        let column = self
            .columns
            .get_mut(&key)
            .ok_or_else(|| CohortError::UnknownColumn(key.to_string()))?;

        match column.treatment {
            Treatment::Fixed if treat && column.meta.is_categorical => Ok(()),
            Treatment::Fixed => Err(CohortError::InvalidOperation(format!(
                "Column {} has a fixed representation and cannot be toggled.",
                key
            ))),
            Treatment::Numeric if !treat => Ok(()),
            Treatment::Numeric if column.meta.category != ColumnCategory::Dataset => {
                Err(CohortError::InvalidOperation(format!(
                    "Only dataset features can be treated as categorical, not {}.",
                    key
                )))
            }
            Treatment::Categorical { .. } if treat => Ok(()),
            Treatment::Numeric => {
                let cache = match &column.data {
                    ColumnData::Numeric(values) => values.clone(),
                    ColumnData::Text(_) => {
                        return Err(CohortError::InvalidOperation(format!(
                            "Column {} holds text values.",
                            key
                        )))
                    }
                };
                let distinct = sorted_distinct(&cache);
                let indexes = cache
                    .iter()
                    .map(|v| {
                        distinct
                            .binary_search_by(|d| d.total_cmp(v))
                            .map(|i| i as f64)
                            .unwrap_or(0.0)
                    })
                    .collect();
                column.data = ColumnData::Numeric(indexes);
                column.meta.treat_as_categorical = true;
                column.meta.sorted_categorical_values =
                    Some(distinct.iter().map(|v| v.to_string()).collect());
                column.treatment = Treatment::Categorical { numeric_cache: cache };
                self.bins.remove(&key);
                debug!("treating {} as categorical ({} categories)", key, distinct.len());
                Ok(())
            }
            Treatment::Categorical { .. } => {
                if let Treatment::Categorical { numeric_cache } =
                    std::mem::replace(&mut column.treatment, Treatment::Numeric)
                {
                    column.data = ColumnData::Numeric(numeric_cache);
                }
                column.meta.treat_as_categorical = false;
                column.meta.sorted_categorical_values = None;
                debug!("restored numeric values of {}", key);
                self.add_bin(key, None)?;
                Ok(())
            }
        }
    }

    fn column_entry(&self, key: ColumnKey) -> Result<&Column> {
        self.columns
            .get(&key)
            .ok_or_else(|| CohortError::UnknownColumn(key.to_string()))
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn config(&self) -> &JointDatasetConfig {
        &self.config
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn has_dataset(&self) -> bool {
        !self.feature_names.is_empty() && self.row_count > 0
    }

    pub fn has_predicted_y(&self) -> bool {
        self.columns.contains_key(&ColumnKey::PredictedY)
            || self.columns.contains_key(&ColumnKey::PredictedYLabel(0))
    }

    pub fn has_true_y(&self) -> bool {
        self.columns.contains_key(&ColumnKey::TrueY)
            || self.columns.contains_key(&ColumnKey::TrueYLabel(0))
    }

    pub fn has_predicted_probabilities(&self) -> bool {
        self.columns.contains_key(&ColumnKey::ProbabilityClass(0))
    }

    pub fn has_local_explanations(&self) -> bool {
        self.local_importance.is_some()
    }

    pub fn dataset_feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn local_explanation_feature_count(&self) -> usize {
        self.local_importance.as_ref().map(|m| m.ncols()).unwrap_or(0)
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn prediction_class_count(&self) -> usize {
        self.prediction_class_count
    }

    pub fn weight_vector(&self) -> WeightVector {
        self.weight_vector
    }

    /// Reduced importances, rows × features.
    pub fn local_importance(&self) -> Option<&Array2<f64>> {
        self.local_importance.as_ref()
    }

    pub fn column_keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.columns.keys().copied()
    }

    pub fn meta(&self, key: ColumnKey) -> Option<&ColumnMeta> {
        self.columns.get(&key).map(|c| &c.meta)
    }

    pub fn column(&self, key: ColumnKey) -> Option<&ColumnData> {
        self.columns.get(&key).map(|c| &c.data)
    }

    pub fn bins(&self, key: ColumnKey) -> Option<&Bins> {
        self.bins.get(&key)
    }

    /// Key of the feature column with this display name.
    pub fn feature_key(&self, name: &str) -> Option<ColumnKey> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(ColumnKey::Data)
    }

    pub fn unwrap(&self, key: ColumnKey) -> Result<Vec<CellValue<'_>>> {
        let data = &self.column_entry(key)?.data;
        Ok((0..data.len()).filter_map(|i| data.cell(i)).collect())
    }

    pub fn unwrap_numeric(&self, key: ColumnKey) -> Result<Vec<f64>> {
        self.column_entry(key)?
            .data
            .as_numeric()
            .map(<[f64]>::to_vec)
            .ok_or_else(|| CohortError::InvalidOperation(format!("Column {} holds text values.", key)))
    }

    /// Each value replaced by the index of the first bound `>= value`.
    pub fn unwrap_binned(&self, key: ColumnKey, upper_bounds: &[f64]) -> Result<Vec<Option<usize>>> {
        let values = self.unwrap_numeric(key)?;
        Ok(values
            .iter()
            .map(|&v| upper_bounds.iter().position(|&bound| bound >= v))
            .collect())
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.row_count).then_some(RowView { dataset: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        (0..self.row_count).map(move |index| RowView { dataset: self, index })
    }

    pub fn cell(&self, key: ColumnKey, row: usize) -> Option<CellValue<'_>> {
        self.columns.get(&key)?.data.cell(row)
    }

    /// Feature indexes of a row, by descending absolute reduced importance.
    pub fn sorted_local_importance(&self, row: usize) -> Option<Vec<usize>> {
        let matrix = self.local_importance.as_ref()?;
        if row >= matrix.nrows() {
            return None;
        }
        let importances = matrix.row(row);
        let mut order: Vec<usize> = (0..importances.len()).collect();
        order.sort_by(|&a, &b| importances[b].abs().total_cmp(&importances[a].abs()));
        Some(order)
    }

    /// Whether the prediction of a row matches its ground truth, across every
    /// label. `None` without both predictions and labels.
    pub fn prediction_is_correct(&self, row: usize) -> Option<bool> {
        if self.columns.contains_key(&ColumnKey::PredictedY) {
            let predicted = self.cell(ColumnKey::PredictedY, row)?;
            let truth = self.cell(ColumnKey::TrueY, row)?;
            return Some(predicted == truth);
        }
        if !self.has_predicted_y() || !self.has_true_y() {
            return None;
        }
        let mut k = 0;
        let mut correct = true;
        while let Some(predicted) = self.cell(ColumnKey::PredictedYLabel(k), row) {
            correct &= Some(predicted) == self.cell(ColumnKey::TrueYLabel(k), row);
            k += 1;
        }
        Some(correct)
    }
}

/// A row of the joint dataset, borrowed.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    dataset: &'a JointDataset,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, key: ColumnKey) -> Option<CellValue<'a>> {
        self.dataset.cell(key, self.index)
    }

    pub fn to_map(&self) -> BTreeMap<ColumnKey, RawValue> {
        self.dataset
            .columns
            .iter()
            .filter_map(|(key, column)| column.data.cell(self.index).map(|v| (*key, v.to_raw())))
            .collect()
    }
}

impl RowAccess for RowView<'_> {
    fn value(&self, key: ColumnKey) -> Option<CellValue<'_>> {
        self.get(key)
    }
}

impl FilterContext for JointDataset {
    fn resolve_column(&self, name: &str) -> Option<ColumnKey> {
        name.parse().ok().or_else(|| self.feature_key(name))
    }

    fn categorical(&self, key: ColumnKey) -> Option<CategoricalValues<'_>> {
        let column = self.columns.get(&key)?;
        column
            .meta
            .behaves_categorical()
            .then_some(CategoricalValues::Indexed)
    }
}

fn validate(input: &DatasetInput) -> Result<()> {
    let rows = input.features.len();
    let feature_count = input.feature_names.len();

    if input.categorical_features.len() != feature_count {
        return Err(CohortError::IncompatibleDimensions(format!(
            "{} categorical flags for {} features.",
            input.categorical_features.len(),
            feature_count
        )));
    }
    if let Some((i, row)) = input
        .features
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != feature_count)
    {
        return Err(CohortError::IncompatibleDimensions(format!(
            "Row {} has {} values, but {} feature names were given.",
            i,
            row.len(),
            feature_count
        )));
    }

    let parallel = [
        ("Predicted Y", input.predicted_y.as_ref().map(Labels::len)),
        ("True Y", input.true_y.as_ref().map(Labels::len)),
        ("Probabilities", input.probabilities.as_ref().map(|p| p.nrows())),
        ("Local importances", input.local_explanations.as_ref().map(|l| l.dim().0)),
    ];
    for (name, len) in parallel {
        if let Some(len) = len {
            if len != rows {
                return Err(CohortError::IncompatibleDimensions(format!(
                    "{} has {} rows, but the dataset has {}.",
                    name, len, rows
                )));
            }
        }
    }

    if let Some(importances) = &input.local_explanations {
        let (_, features, _) = importances.dim();
        if feature_count > 0 && features != feature_count {
            return Err(CohortError::IncompatibleDimensions(format!(
                "Local importances cover {} features, but the dataset has {}.",
                features, feature_count
            )));
        }
    }

    if let (Some(Labels::Multi(p)), Some(Labels::Multi(t))) = (&input.predicted_y, &input.true_y) {
        if p.ncols() != t.ncols() {
            return Err(CohortError::IncompatibleDimensions(format!(
                "Predicted Y has {} labels, but True Y has {}.",
                p.ncols(),
                t.ncols()
            )));
        }
    }
    Ok(())
}

/// Upper bound on class labels generated from label values alone.
const MAX_GENERATED_CLASS_LABELS: usize = 10_000;

/// Display labels of the prediction classes.
fn class_labels(
    class_names: Option<Vec<String>>,
    labels: [Option<&Labels>; 2],
    probabilities: Option<&Array2<f64>>,
) -> Vec<String> {
    if let Some(names) = class_names {
        return names;
    }
    let mut count = probabilities.map(|p| p.ncols()).unwrap_or(0);
    for label in labels.into_iter().flatten() {
        match label {
            Labels::Single(values) => {
                let max = values.iter().copied().filter(|v| v.is_finite()).fold(-1.0, f64::max);
                let implied = (max + 1.0).max(0.0);
                if implied > MAX_GENERATED_CLASS_LABELS as f64 {
                    warn!(
                        "largest class code {} implies more than {} classes; generating {} labels",
                        max, MAX_GENERATED_CLASS_LABELS, MAX_GENERATED_CLASS_LABELS
                    );
                }
                count = count.max((implied as usize).min(MAX_GENERATED_CLASS_LABELS));
            }
            Labels::Multi(matrix) => count = count.max(matrix.ncols()),
            Labels::Text(_) => {}
        }
    }
    (0..count).map(|i| format!("Class {}", i)).collect()
}

/// Maps raw values to indexes into their category list. Returns the indexes,
/// the categories, and how many values were missing from a fixed list.
fn categorize(values: &[&RawValue], fixed: Option<&[RawValue]>) -> (Vec<f64>, Vec<RawValue>, usize) {
    match fixed {
        Some(categories) => {
            let mut unknown = 0;
            let indexes = values
                .iter()
                .map(|v| match categories.iter().position(|c| c == *v) {
                    Some(i) => i as f64,
                    None => {
                        unknown += 1;
                        0.0
                    }
                })
                .collect();
            (indexes, categories.to_vec(), unknown)
        }
        None => {
            let mut categories: Vec<RawValue> = values.iter().map(|v| (*v).clone()).collect();
            categories.sort_by(|a, b| a.total_cmp(b));
            categories.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
            let indexes = values
                .iter()
                .map(|v| {
                    categories
                        .binary_search_by(|c| c.total_cmp(v))
                        .map(|i| i as f64)
                        .unwrap_or(0.0)
                })
                .collect();
            (indexes, categories, 0)
        }
    }
}

fn sorted_distinct(values: &[f64]) -> Vec<f64> {
    let mut distinct = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    distinct
}

fn count_distinct(values: &[f64]) -> usize {
    sorted_distinct(values).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RangeType;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};
    use proptest::prelude::*;

    fn seeded() -> Option<JointDatasetConfig> {
        Some(JointDatasetConfig {
            dither_seed: Some(7),
            ..JointDatasetConfig::default()
        })
    }

    fn binary_input() -> DatasetInput {
        let features = vec![
            vec![RawValue::from(34.0), RawValue::from("blue")],
            vec![RawValue::from(51.0), RawValue::from("red")],
            vec![RawValue::from(27.0), RawValue::from("blue")],
            vec![RawValue::from(62.0), RawValue::from("green")],
        ];
        DatasetInput::new(
            features,
            vec!["age".to_string(), "color".to_string()],
            vec![false, true],
            ModelType::Binary,
        )
        .with_true_y(Labels::Single(vec![0.0, 1.0, 1.0, 1.0]))
        .with_predicted_y(Labels::Single(vec![0.0, 1.0, 0.0, 1.0]))
        .with_probabilities(array![[0.9, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]])
    }

    #[test]
    fn builds_synthetic_and_feature_columns() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        assert_eq!(dataset.row_count(), 4);
        assert!(dataset.has_dataset());
        assert!(dataset.has_predicted_y());
        assert!(dataset.has_true_y());
        assert!(dataset.has_predicted_probabilities());
        assert!(!dataset.has_local_explanations());
        assert_eq!(dataset.prediction_class_count(), 2);

        assert_eq!(dataset.unwrap_numeric(ColumnKey::Index)?, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(0))?, vec![34.0, 51.0, 27.0, 62.0]);

        let age = dataset.meta(ColumnKey::Data(0)).unwrap();
        assert_eq!(age.label, "age");
        assert_eq!(age.index, Some(0));
        assert!(!age.is_categorical);
        let range = age.feature_range.unwrap();
        assert_eq!((range.min, range.max, range.range_type), (27.0, 62.0, RangeType::Integer));
        Ok(())
    }

    #[test]
    fn categorical_features_store_sorted_indexes() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        let color = dataset.meta(ColumnKey::Data(1)).unwrap();
        assert!(color.is_categorical);
        assert!(color.feature_range.is_none());
        assert_eq!(
            color.sorted_categorical_values.as_deref(),
            Some(&["blue".to_string(), "green".to_string(), "red".to_string()][..])
        );
        assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(1))?, vec![0.0, 2.0, 0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn values_missing_from_categorical_map_become_zero() -> Result<()> {
        let input = binary_input().with_categorical_map(vec![
            None,
            Some(vec![RawValue::from("red"), RawValue::from("blue")]),
        ]);
        let dataset = JointDataset::new(input, seeded())?;
        // green is not in the map
        assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(1))?, vec![1.0, 0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_fail_construction() {
        let input = binary_input().with_true_y(Labels::Single(vec![0.0, 1.0]));
        let err = JointDataset::new(input, None).unwrap_err();
        assert!(matches!(err, CohortError::IncompatibleDimensions(_)));

        let input = binary_input().with_local_explanations(Array3::zeros((3, 2, 2)));
        assert!(JointDataset::new(input, None).is_err());

        let input = binary_input().with_probabilities(Array2::zeros((5, 2)));
        assert!(JointDataset::new(input, None).is_err());

        let mut input = binary_input();
        input.features[2].pop();
        assert!(matches!(
            JointDataset::new(input, None),
            Err(CohortError::IncompatibleDimensions(_))
        ));
    }

    #[test]
    fn binary_error_column_holds_outcome_codes() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        assert_eq!(
            dataset.unwrap_numeric(ColumnKey::ClassificationError)?,
            vec![0.0, 3.0, 2.0, 3.0]
        );
        let meta = dataset.meta(ColumnKey::ClassificationError).unwrap();
        assert_eq!(meta.sorted_categorical_values.as_ref().unwrap().len(), 4);
        assert!(dataset.column(ColumnKey::RegressionError).is_none());
        Ok(())
    }

    #[test]
    fn regression_error_column_is_absolute_difference() -> Result<()> {
        let input = DatasetInput::new(
            vec![vec![RawValue::from(1.0)], vec![RawValue::from(2.0)]],
            vec!["x".to_string()],
            vec![false],
            ModelType::Regression,
        )
        .with_true_y(Labels::Single(vec![22.6, 50.0]))
        .with_predicted_y(Labels::Single(vec![24.916, 25.082]));
        let dataset = JointDataset::new(input, seeded())?;
        let errors = dataset.unwrap_numeric(ColumnKey::RegressionError)?;
        assert_abs_diff_eq!(errors[0], 2.316, epsilon = 1e-9);
        assert_abs_diff_eq!(errors[1], 24.918, epsilon = 1e-9);
        assert!(dataset.bins(ColumnKey::RegressionError).is_some());
        assert!(!dataset.meta(ColumnKey::PredictedY).unwrap().is_categorical);
        Ok(())
    }

    #[test]
    fn multilabel_columns_are_suffixed() -> Result<()> {
        let input = DatasetInput::new(
            vec![vec![RawValue::from(1.0)], vec![RawValue::from(2.0)]],
            vec!["x".to_string()],
            vec![false],
            ModelType::TextMultilabel,
        )
        .with_true_y(Labels::Multi(array![[1.0, 0.0, 1.0], [0.0, 1.0, 0.0]]))
        .with_predicted_y(Labels::Multi(array![[1.0, 0.0, 1.0], [0.0, 0.0, 0.0]]));
        let dataset = JointDataset::new(input, seeded())?;
        assert_eq!(dataset.num_labels(), 3);
        assert_eq!(dataset.unwrap_numeric(ColumnKey::TrueYLabel(1))?, vec![0.0, 1.0]);
        assert_eq!(dataset.unwrap_numeric(ColumnKey::ClassificationError)?, vec![0.0, 1.0]);
        assert_eq!(dataset.prediction_is_correct(0), Some(true));
        assert_eq!(dataset.prediction_is_correct(1), Some(false));
        Ok(())
    }

    #[test]
    fn probability_columns_per_class() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        assert_eq!(
            dataset.unwrap_numeric(ColumnKey::ProbabilityClass(1))?,
            vec![0.1, 0.8, 0.4, 0.7]
        );
        assert_eq!(dataset.meta(ColumnKey::ProbabilityClass(0)).unwrap().label, "Probability: Class 0");
        Ok(())
    }

    #[test]
    fn dither_is_seeded_and_bounded() -> Result<()> {
        let a = JointDataset::new(binary_input(), seeded())?;
        let b = JointDataset::new(binary_input(), seeded())?;
        let dither = a.unwrap_numeric(ColumnKey::Dither)?;
        assert_eq!(dither, b.unwrap_numeric(ColumnKey::Dither)?);
        assert!(dither.iter().all(|d| (-0.1..0.1).contains(d)));
        Ok(())
    }

    #[test]
    fn local_importances_are_reduced_and_sorted() -> Result<()> {
        let raw = Array3::from_shape_vec(
            (4, 2, 2),
            vec![
                0.1, -0.3, 0.5, 0.5, //
                -1.0, 1.0, 0.2, 0.0, //
                0.0, 0.0, 0.0, 0.0, //
                0.4, 0.4, -0.2, -0.6,
            ],
        )?;
        let input = binary_input().with_local_explanations(raw);
        let mut dataset = JointDataset::new(input, seeded())?;
        assert_eq!(dataset.weight_vector(), WeightVector::AbsAvg);
        assert_eq!(dataset.local_explanation_feature_count(), 2);
        let f0 = dataset.unwrap_numeric(ColumnKey::LocalImportance(0))?;
        assert_abs_diff_eq!(f0[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(f0[1], 1.0, epsilon = 1e-12);
        assert_eq!(dataset.sorted_local_importance(0), Some(vec![1, 0]));
        assert_eq!(dataset.sorted_local_importance(1), Some(vec![0, 1]));
        assert_eq!(dataset.sorted_local_importance(9), None);

        dataset.build_local_flatten_matrix(WeightVector::Class(1))?;
        assert_eq!(dataset.unwrap_numeric(ColumnKey::LocalImportance(1))?, vec![0.5, 0.0, 0.0, -0.6]);
        let range = dataset.meta(ColumnKey::LocalImportance(1)).unwrap().feature_range.unwrap();
        assert_eq!((range.min, range.max), (-0.6, 0.5));
        Ok(())
    }

    #[test]
    fn unwrap_binned_uses_first_bound_at_or_above() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        let binned = dataset.unwrap_binned(ColumnKey::Data(0), &[30.0, 55.0])?;
        assert_eq!(binned, vec![Some(1), Some(1), Some(0), None]);
        assert!(dataset.unwrap_binned(ColumnKey::Data(7), &[1.0]).is_err());
        Ok(())
    }

    #[test]
    fn default_bins_exist_for_numeric_features_only() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        let bins = dataset.bins(ColumnKey::Data(0)).unwrap();
        assert_eq!(bins.len(), 4); // four distinct integer ages
        assert_eq!(*bins.upper_bounds.last().unwrap(), 62.0);
        assert!(dataset.bins(ColumnKey::Data(1)).is_none());
        assert!(dataset.bins(ColumnKey::Index).is_none());
        Ok(())
    }

    #[test]
    fn add_bin_rejects_categorical_columns() -> Result<()> {
        let mut dataset = JointDataset::new(binary_input(), seeded())?;
        assert!(matches!(
            dataset.add_bin(ColumnKey::Data(1), Some(3)),
            Err(CohortError::InvalidOperation(_))
        ));
        assert_eq!(dataset.add_bin(ColumnKey::Data(0), Some(2))?.len(), 2);
        Ok(())
    }

    #[test]
    fn treat_as_categorical_round_trip() -> Result<()> {
        let mut dataset = JointDataset::new(binary_input(), seeded())?;
        dataset.set_treat_as_categorical(ColumnKey::Data(0), true)?;
        assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(0))?, vec![1.0, 2.0, 0.0, 3.0]);
        let meta = dataset.meta(ColumnKey::Data(0)).unwrap();
        assert!(meta.treat_as_categorical);
        assert!(!meta.is_categorical);
        assert_eq!(
            meta.sorted_categorical_values.as_deref(),
            Some(&["27".to_string(), "34".to_string(), "51".to_string(), "62".to_string()][..])
        );
        assert!(dataset.bins(ColumnKey::Data(0)).is_none());
        assert_eq!(
            dataset.categorical(ColumnKey::Data(0)),
            Some(CategoricalValues::Indexed)
        );

        dataset.set_treat_as_categorical(ColumnKey::Data(0), false)?;
        assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(0))?, vec![34.0, 51.0, 27.0, 62.0]);
        assert!(dataset.bins(ColumnKey::Data(0)).is_some());
        assert!(dataset.categorical(ColumnKey::Data(0)).is_none());
        Ok(())
    }

    #[test]
    fn intrinsic_categorical_columns_cannot_be_untoggled() -> Result<()> {
        let mut dataset = JointDataset::new(binary_input(), seeded())?;
        dataset.set_treat_as_categorical(ColumnKey::Data(1), true)?;
        assert!(matches!(
            dataset.set_treat_as_categorical(ColumnKey::Data(1), false),
            Err(CohortError::InvalidOperation(_))
        ));
        assert!(matches!(
            dataset.set_treat_as_categorical(ColumnKey::Data(5), true),
            Err(CohortError::UnknownColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn only_dataset_features_can_be_treated_as_categorical() -> Result<()> {
        let input = DatasetInput::new(
            vec![vec![RawValue::from(1.0)], vec![RawValue::from(2.0)]],
            vec!["rooms".to_string()],
            vec![false],
            ModelType::Regression,
        )
        .with_true_y(Labels::Single(vec![22.6, 50.0]))
        .with_predicted_y(Labels::Single(vec![24.916, 25.082]));
        let mut dataset = JointDataset::new(input, seeded())?;

        for key in [ColumnKey::PredictedY, ColumnKey::TrueY, ColumnKey::RegressionError] {
            assert!(matches!(
                dataset.set_treat_as_categorical(key, true),
                Err(CohortError::InvalidOperation(_))
            ));
            assert!(!dataset.meta(key).unwrap().treat_as_categorical);
        }
        assert_eq!(dataset.unwrap_numeric(ColumnKey::PredictedY)?, vec![24.916, 25.082]);
        assert_eq!(dataset.prediction_is_correct(0), Some(false));
        assert!(dataset.bins(ColumnKey::PredictedY).is_some());

        dataset.set_treat_as_categorical(ColumnKey::Data(0), true)?;
        assert!(dataset.meta(ColumnKey::Data(0)).unwrap().treat_as_categorical);

        let mut binary = JointDataset::new(binary_input(), seeded())?;
        assert!(matches!(
            binary.set_treat_as_categorical(ColumnKey::ProbabilityClass(1), true),
            Err(CohortError::InvalidOperation(_))
        ));
        assert_eq!(binary.unwrap_numeric(ColumnKey::ProbabilityClass(1))?, vec![0.1, 0.8, 0.4, 0.7]);
        Ok(())
    }

    #[test]
    fn sparse_class_codes_do_not_explode_class_labels() -> Result<()> {
        let input = DatasetInput::new(
            vec![vec![RawValue::from(1.0)], vec![RawValue::from(2.0)]],
            vec!["x".to_string()],
            vec![false],
            ModelType::Multiclass,
        )
        .with_true_y(Labels::Single(vec![0.0, 1e9]))
        .with_predicted_y(Labels::Single(vec![0.0, 1e9]));
        let dataset = JointDataset::new(input, seeded())?;
        assert_eq!(dataset.prediction_class_count(), MAX_GENERATED_CLASS_LABELS);
        assert_eq!(dataset.unwrap_numeric(ColumnKey::PredictedY)?, vec![0.0, 1e9]);
        assert_eq!(dataset.prediction_is_correct(1), Some(true));
        Ok(())
    }

    #[test]
    fn rows_resolve_by_index_and_name() -> Result<()> {
        let dataset = JointDataset::new(binary_input(), seeded())?;
        let row = dataset.row(1).unwrap();
        assert_eq!(row.get(ColumnKey::Data(0)), Some(CellValue::Number(51.0)));
        assert_eq!(row.value(ColumnKey::TrueY), Some(CellValue::Number(1.0)));
        assert!(dataset.row(4).is_none());

        let map = row.to_map();
        assert_eq!(map.get(&ColumnKey::Index), Some(&RawValue::Number(1.0)));
        assert_eq!(map.get(&ColumnKey::ClassificationError), Some(&RawValue::Number(3.0)));

        assert_eq!(dataset.resolve_column("age"), Some(ColumnKey::Data(0)));
        assert_eq!(dataset.resolve_column("Data1"), Some(ColumnKey::Data(1)));
        assert_eq!(dataset.resolve_column("height"), None);
        Ok(())
    }

    #[test]
    fn text_features_stay_text() -> Result<()> {
        let input = DatasetInput::new(
            vec![vec![RawValue::from("hello")], vec![RawValue::from(3.0)]],
            vec!["note".to_string()],
            vec![false],
            ModelType::Multiclass,
        );
        let dataset = JointDataset::new(input, seeded())?;
        assert!(matches!(dataset.column(ColumnKey::Data(0)), Some(ColumnData::Text(_))));
        assert!(dataset.unwrap_numeric(ColumnKey::Data(0)).is_err());
        assert_eq!(dataset.unwrap(ColumnKey::Data(0))?[1], CellValue::Text("3"));
        assert_eq!(dataset.prediction_is_correct(0), None);
        Ok(())
    }

    proptest! {
        #[test]
        fn categorical_toggle_restores_values(values in prop::collection::vec(-1000i32..1000, 1..40)) {
            let features = values.iter().map(|&v| vec![RawValue::from(v as f64 / 4.0)]).collect();
            let input = DatasetInput::new(features, vec!["x".to_string()], vec![false], ModelType::Regression);
            let mut dataset = JointDataset::new(input, seeded()).unwrap();
            let before = dataset.unwrap_numeric(ColumnKey::Data(0)).unwrap();

            dataset.set_treat_as_categorical(ColumnKey::Data(0), true).unwrap();
            let categories = dataset.meta(ColumnKey::Data(0)).unwrap().sorted_categorical_values.clone().unwrap();
            for index in dataset.unwrap_numeric(ColumnKey::Data(0)).unwrap() {
                prop_assert!((index as usize) < categories.len());
            }

            dataset.set_treat_as_categorical(ColumnKey::Data(0), false).unwrap();
            prop_assert_eq!(dataset.unwrap_numeric(ColumnKey::Data(0)).unwrap(), before);
        }
    }
}
