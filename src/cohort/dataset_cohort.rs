// src/cohort/dataset_cohort.rs
use crate::cohort::CohortStats;
use crate::core::{CellValue, CohortError, ColumnKey, ModelType, Result};
use crate::dataset::{JointDataset, RowView};
use crate::filter::{
    evaluate, evaluate_composite_list, ColumnRanges, CompositeFilter, Filter, WithColumnRanges,
};
use crate::metrics::{generate_metrics, LabeledStatistic, MetricCaches};
use crate::traits::FilterContext;
use log::debug;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// The serializable part of a cohort: its name and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortDefinition {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub composite_filters: Vec<CompositeFilter>,
}

/// A named subset of dataset rows.
///
/// A row belongs to the cohort when it satisfies every top-level filter and
/// every composite filter. The selection and its statistics are recomputed
/// from the dataset on each change of filters; the dataset itself is never
/// modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    name: String,
    filters: Vec<Filter>,
    composite_filters: Vec<CompositeFilter>,
    model_type: ModelType,
    column_ranges: Option<ColumnRanges>,
    selected_indexes: Vec<usize>,
    stats: CohortStats,
}

impl Cohort {
    pub fn new(
        name: impl Into<String>,
        dataset: &JointDataset,
        filters: Vec<Filter>,
        composite_filters: Vec<CompositeFilter>,
        model_type: ModelType,
        column_ranges: Option<ColumnRanges>,
    ) -> Self {
        let mut cohort = Cohort {
            name: name.into(),
            filters,
            composite_filters,
            model_type,
            column_ranges,
            selected_indexes: Vec::new(),
            stats: CohortStats::default(),
        };
        cohort.refresh(dataset);
        cohort
    }

    /// The whole dataset, without filters.
    pub fn all_data(name: impl Into<String>, dataset: &JointDataset) -> Self {
        Cohort::new(name, dataset, Vec::new(), Vec::new(), dataset.model_type(), None)
    }

    pub fn from_definition(
        definition: CohortDefinition,
        dataset: &JointDataset,
        column_ranges: Option<ColumnRanges>,
    ) -> Self {
        Cohort::new(
            definition.name,
            dataset,
            definition.filters,
            definition.composite_filters,
            dataset.model_type(),
            column_ranges,
        )
    }

    pub fn definition(&self) -> CohortDefinition {
        CohortDefinition {
            name: self.name.clone(),
            filters: self.filters.clone(),
            composite_filters: self.composite_filters.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn composite_filters(&self) -> &[CompositeFilter] {
        &self.composite_filters
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn column_ranges(&self) -> Option<&ColumnRanges> {
        self.column_ranges.as_ref()
    }

    /// Row indexes of the cohort, ascending unless re-sorted.
    pub fn selected_indexes(&self) -> &[usize] {
        &self.selected_indexes
    }

    pub fn stats(&self) -> &CohortStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.selected_indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_indexes.is_empty()
    }

    /// Re-runs the filters over every row of `dataset`.
    pub fn refresh(&mut self, dataset: &JointDataset) {
        self.selected_indexes = select_rows(
            dataset,
            &self.filters,
            &self.composite_filters,
            self.column_ranges.as_ref(),
        );
        self.stats = CohortStats::compute(dataset, &self.selected_indexes);
        debug!(
            "Cohort '{}' selected {} of {} rows",
            self.name,
            self.selected_indexes.len(),
            dataset.row_count()
        );
    }

    pub fn update_filters(&mut self, dataset: &JointDataset, filters: Vec<Filter>) {
        self.filters = filters;
        self.refresh(dataset);
    }

    pub fn update_composite_filters(
        &mut self,
        dataset: &JointDataset,
        composite_filters: Vec<CompositeFilter>,
    ) {
        self.composite_filters = composite_filters;
        self.refresh(dataset);
    }

    pub fn add_filter(&mut self, dataset: &JointDataset, filter: Filter) {
        self.filters.push(filter);
        self.refresh(dataset);
    }

    /// Removes the top-level filter at `index`; `None` leaves the cohort as is.
    pub fn delete_filter(&mut self, dataset: &JointDataset, index: usize) -> Option<Filter> {
        if index >= self.filters.len() {
            return None;
        }
        let removed = self.filters.remove(index);
        self.refresh(dataset);
        Some(removed)
    }

    pub fn filtered_rows<'a>(
        &'a self,
        dataset: &'a JointDataset,
    ) -> impl Iterator<Item = RowView<'a>> + 'a {
        self.selected_indexes
            .iter()
            .filter_map(move |&i| dataset.row(i))
    }

    /// Values of one column over the cohort rows, in cohort order.
    pub fn unwrap<'a>(&self, dataset: &'a JointDataset, key: ColumnKey) -> Result<Vec<CellValue<'a>>> {
        let column = dataset
            .column(key)
            .ok_or_else(|| CohortError::UnknownColumn(key.to_string()))?;
        Ok(self
            .selected_indexes
            .iter()
            .filter_map(|&i| column.cell(i))
            .collect())
    }

    /// Reorders the cohort rows by the values of `key`. Numbers sort before
    /// text. The order is reset by the next refresh.
    pub fn sort(&mut self, dataset: &JointDataset, key: ColumnKey, reverse: bool) -> Result<()> {
        let column = dataset
            .column(key)
            .ok_or_else(|| CohortError::UnknownColumn(key.to_string()))?;
        self.selected_indexes.sort_by(|&a, &b| {
            let ordering = match (column.cell(a), column.cell(b)) {
                (Some(x), Some(y)) => x.total_cmp(y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            };
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(())
    }

    /// Mean absolute reduced local importance per feature over the cohort.
    /// `None` without local explanations.
    pub fn average_importance(&self, dataset: &JointDataset) -> Option<Vec<f64>> {
        let importances = dataset.local_importance()?;
        let rows: Vec<usize> = self
            .selected_indexes
            .iter()
            .copied()
            .filter(|&i| i < importances.nrows())
            .collect();
        if rows.is_empty() {
            return Some(vec![0.0; importances.ncols()]);
        }
        let selected = importances.select(Axis(0), &rows).mapv(f64::abs);
        selected.mean_axis(Axis(0)).map(|mean| mean.to_vec())
    }

    /// Statistics of this cohort for its model type.
    pub fn metrics(&self, dataset: &JointDataset, caches: &MetricCaches<'_>) -> Vec<LabeledStatistic> {
        generate_metrics(
            dataset,
            std::slice::from_ref(&self.selected_indexes),
            self.model_type,
            caches,
        )
        .pop()
        .unwrap_or_default()
    }
}

fn select_rows(
    dataset: &JointDataset,
    filters: &[Filter],
    composite_filters: &[CompositeFilter],
    column_ranges: Option<&ColumnRanges>,
) -> Vec<usize> {
    let layered;
    let context: &dyn FilterContext = match column_ranges {
        Some(ranges) => {
            layered = WithColumnRanges {
                base: dataset,
                ranges,
            };
            &layered
        }
        None => dataset,
    };
    dataset
        .rows()
        .filter(|row| {
            evaluate(row, filters, context) && evaluate_composite_list(row, composite_filters, context)
        })
        .map(|row| row.index())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DatasetInput, Labels, RawValue};
    use crate::filter::{ColumnRange, FilterMethod};
    use crate::metrics::{find, MetricKey, QuestionAnsweringCacheMap, QuestionAnsweringScores};
    use crate::traits::QuestionAnsweringCache;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    fn dataset() -> Result<JointDataset> {
        let features = vec![
            vec![RawValue::from(34.0), RawValue::from("blue")],
            vec![RawValue::from(51.0), RawValue::from("red")],
            vec![RawValue::from(27.0), RawValue::from("blue")],
            vec![RawValue::from(62.0), RawValue::from("green")],
        ];
        let importances = Array3::from_shape_vec(
            (4, 2, 1),
            vec![0.5, -1.0, -0.5, 2.0, 1.5, 0.0, -2.5, 1.0],
        )?;
        let input = DatasetInput::new(
            features,
            vec!["age".to_string(), "color".to_string()],
            vec![false, true],
            ModelType::Binary,
        )
        .with_true_y(Labels::Single(vec![0.0, 1.0, 1.0, 1.0]))
        .with_predicted_y(Labels::Single(vec![0.0, 1.0, 0.0, 1.0]))
        .with_local_explanations(importances);
        JointDataset::new(input, None)
    }

    fn cohort(dataset: &JointDataset, filters: Vec<Filter>) -> Cohort {
        Cohort::new("test", dataset, filters, Vec::new(), ModelType::Binary, None)
    }

    #[test]
    fn all_data_selects_every_row() -> Result<()> {
        let dataset = dataset()?;
        let all = Cohort::all_data("All data", &dataset);
        assert_eq!(all.selected_indexes(), &[0, 1, 2, 3]);
        assert_eq!(all.stats().total_cohort, 4);
        assert_eq!(all.stats().error_rate, 25.0);
        Ok(())
    }

    #[test]
    fn end_to_end_binary_cohort() -> Result<()> {
        let dataset = dataset()?;
        assert_eq!(
            dataset.unwrap_numeric(ColumnKey::ClassificationError)?,
            vec![0.0, 3.0, 2.0, 3.0]
        );

        let positives = cohort(
            &dataset,
            vec![Filter::new("PredictedY", FilterMethod::Equal, vec![1.0])],
        );
        assert_eq!(positives.selected_indexes(), &[1, 3]);
        assert_eq!(positives.stats().error_rate, 0.0);

        let all = Cohort::all_data("All data", &dataset);
        let stats = all.metrics(&dataset, &MetricCaches::default());
        let stat = |key| find(&stats, key).and_then(|s| s.stat).unwrap();
        assert_eq!(stat(MetricKey::Count), 4.0);
        assert_abs_diff_eq!(stat(MetricKey::Accuracy), 0.75);
        assert_abs_diff_eq!(stat(MetricKey::Precision), 1.0);
        assert_abs_diff_eq!(stat(MetricKey::Recall), 2.0 / 3.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn filters_and_composite_filters_are_combined() -> Result<()> {
        let dataset = dataset()?;
        let composite = vec![CompositeFilter::Or(vec![
            CompositeFilter::leaf(Filter::new("color", FilterMethod::Includes, vec![0.0])),
            CompositeFilter::leaf(Filter::new("age", FilterMethod::GreaterThan, vec![60.0])),
        ])];
        let mut cohort = Cohort::new(
            "blue or old",
            &dataset,
            vec![Filter::new("Data0", FilterMethod::LessThan, vec![55.0])],
            composite,
            ModelType::Binary,
            None,
        );
        // color categories sort as blue, green, red
        assert_eq!(cohort.selected_indexes(), &[0, 2]);

        cohort.update_composite_filters(&dataset, Vec::new());
        assert_eq!(cohort.selected_indexes(), &[0, 1, 2]);
        Ok(())
    }

    #[test]
    fn filter_edits_recompute_selection() -> Result<()> {
        let dataset = dataset()?;
        let mut cohort = cohort(&dataset, Vec::new());
        cohort.add_filter(&dataset, Filter::new("age", FilterMethod::InTheRangeOf, vec![30.0, 60.0]));
        assert_eq!(cohort.selected_indexes(), &[0, 1]);
        assert_eq!(cohort.stats().total_cohort_correct, 2);

        cohort.add_filter(&dataset, Filter::new("TrueY", FilterMethod::Equal, vec![0.0]));
        assert_eq!(cohort.selected_indexes(), &[0]);

        assert!(cohort.delete_filter(&dataset, 5).is_none());
        let removed = cohort.delete_filter(&dataset, 0).unwrap();
        assert_eq!(removed.method, FilterMethod::InTheRangeOf);
        assert_eq!(cohort.selected_indexes(), &[0]);

        cohort.update_filters(&dataset, Vec::new());
        assert_eq!(cohort.len(), 4);
        Ok(())
    }

    #[test]
    fn refresh_is_idempotent() -> Result<()> {
        let dataset = dataset()?;
        let mut cohort = cohort(
            &dataset,
            vec![Filter::new("ClassificationError", FilterMethod::Includes, vec![2.0, 3.0])],
        );
        let before = cohort.clone();
        cohort.refresh(&dataset);
        cohort.refresh(&dataset);
        assert_eq!(cohort, before);
        assert_eq!(cohort.selected_indexes(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn empty_cohort() -> Result<()> {
        let dataset = dataset()?;
        let cohort = cohort(
            &dataset,
            vec![Filter::new("age", FilterMethod::GreaterThan, vec![100.0])],
        );
        assert!(cohort.is_empty());
        assert_eq!(cohort.stats().error_rate, 0.0);
        assert_eq!(cohort.average_importance(&dataset), Some(vec![0.0, 0.0]));
        let stats = cohort.metrics(&dataset, &MetricCaches::default());
        assert!(stats.iter().all(|s| s.stat == Some(0.0)));
        Ok(())
    }

    #[test]
    fn unwrap_and_sort_follow_cohort_rows() -> Result<()> {
        let dataset = dataset()?;
        let mut cohort = cohort(
            &dataset,
            vec![Filter::new("Index", FilterMethod::GreaterThanEqualTo, vec![1.0])],
        );
        cohort.sort(&dataset, ColumnKey::Data(0), true)?;
        assert_eq!(cohort.selected_indexes(), &[3, 1, 2]);
        assert_eq!(
            cohort.unwrap(&dataset, ColumnKey::Data(0))?,
            vec![CellValue::Number(62.0), CellValue::Number(51.0), CellValue::Number(27.0)]
        );
        let rows: Vec<usize> = cohort.filtered_rows(&dataset).map(|r| r.index()).collect();
        assert_eq!(rows, vec![3, 1, 2]);

        assert!(matches!(
            cohort.sort(&dataset, ColumnKey::ProbabilityClass(9), false),
            Err(CohortError::UnknownColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn sorting_keeps_cached_metrics_reachable() -> Result<()> {
        let dataset = dataset()?;
        let mut cache = QuestionAnsweringCacheMap::new();
        cache.insert(
            &[0, 1, 2],
            QuestionAnsweringScores {
                exact_match_ratio: 0.66,
                f1_score: 0.7,
                meteor_score: 0.1,
                bleu_score: 0.2,
                bert_score: 0.3,
                rouge_score: 0.4,
            },
        );
        let caches = MetricCaches {
            question_answering: Some(&cache as &dyn QuestionAnsweringCache),
            ..MetricCaches::default()
        };
        let mut cohort = Cohort::new(
            "first three",
            &dataset,
            vec![Filter::new("Index", FilterMethod::LessThan, vec![3.0])],
            Vec::new(),
            ModelType::QuestionAnswering,
            None,
        );
        let exact_match = |stats: &[LabeledStatistic]| {
            find(stats, MetricKey::ExactMatchRatio).and_then(|s| s.stat)
        };
        assert_eq!(exact_match(&cohort.metrics(&dataset, &caches)), Some(0.66));

        cohort.sort(&dataset, ColumnKey::Data(0), false)?;
        assert_eq!(cohort.selected_indexes(), &[2, 0, 1]);
        assert_eq!(exact_match(&cohort.metrics(&dataset, &caches)), Some(0.66));
        Ok(())
    }

    #[test]
    fn average_importance_over_cohort() -> Result<()> {
        let dataset = dataset()?;
        let cohort = cohort(
            &dataset,
            vec![Filter::new("Index", FilterMethod::LessThan, vec![2.0])],
        );
        let average = cohort.average_importance(&dataset).unwrap();
        assert_abs_diff_eq!(average[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(average[1], 1.5, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn column_ranges_supply_raw_categories() -> Result<()> {
        let dataset = dataset()?;
        let mut ranges = ColumnRanges::new();
        ranges.insert(ColumnKey::Data(0), ColumnRange::categorical(vec![RawValue::from(27.0), RawValue::from(62.0)]));
        let cohort = Cohort::new(
            "extremes",
            &dataset,
            vec![Filter::new("Data0", FilterMethod::Includes, vec![1.0])],
            Vec::new(),
            ModelType::Binary,
            Some(ranges),
        );
        assert_eq!(cohort.selected_indexes(), &[3]);
        Ok(())
    }

    #[test]
    fn definition_round_trips_through_json() -> Result<()> {
        let dataset = dataset()?;
        let original = Cohort::new(
            "young",
            &dataset,
            vec![Filter::new("age", FilterMethod::LessThanEqualTo, vec![34.0])],
            vec![CompositeFilter::leaf(Filter::new("PredictedY", FilterMethod::Equal, vec![0.0]))],
            ModelType::Binary,
            None,
        );
        let json = serde_json::to_string(&original.definition()).unwrap();
        assert!(json.contains("\"compositeFilters\""));
        let definition: CohortDefinition = serde_json::from_str(&json).unwrap();
        let restored = Cohort::from_definition(definition, &dataset, None);
        assert_eq!(restored, original);
        assert_eq!(restored.selected_indexes(), &[0, 2]);
        Ok(())
    }
}
