// src/filter/ranges.rs
use crate::core::{ColumnKey, RangeType, RawValue};
use crate::traits::{CategoricalValues, FilterContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally supplied description of one column, for rows that hold raw
/// values rather than category indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRange {
    pub is_categorical: bool,
    #[serde(default)]
    pub treat_as_categorical: bool,
    #[serde(default)]
    pub sorted_unique_values: Vec<RawValue>,
    pub range_type: RangeType,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ColumnRange {
    pub fn categorical(sorted_unique_values: Vec<RawValue>) -> Self {
        ColumnRange {
            is_categorical: true,
            treat_as_categorical: false,
            sorted_unique_values,
            range_type: RangeType::Categorical,
            min: None,
            max: None,
        }
    }

    pub fn numeric(min: f64, max: f64, range_type: RangeType) -> Self {
        ColumnRange {
            is_categorical: false,
            treat_as_categorical: false,
            sorted_unique_values: Vec::new(),
            range_type,
            min: Some(min),
            max: Some(max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRanges {
    ranges: BTreeMap<ColumnKey, ColumnRange>,
}

impl ColumnRanges {
    pub fn new() -> Self {
        ColumnRanges::default()
    }

    pub fn insert(&mut self, key: ColumnKey, range: ColumnRange) -> Option<ColumnRange> {
        self.ranges.insert(key, range)
    }

    pub fn get(&self, key: ColumnKey) -> Option<&ColumnRange> {
        self.ranges.get(&key)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FilterContext for ColumnRanges {
    fn categorical(&self, key: ColumnKey) -> Option<CategoricalValues<'_>> {
        let range = self.ranges.get(&key)?;
        if !(range.is_categorical || range.treat_as_categorical) {
            return None;
        }
        if key.is_outcome() {
            Some(CategoricalValues::Indexed)
        } else {
            Some(CategoricalValues::Raw(&range.sorted_unique_values))
        }
    }
}

/// Column metadata of a base context, completed by external column ranges
/// for columns the base knows nothing categorical about.
pub struct WithColumnRanges<'a> {
    pub base: &'a dyn FilterContext,
    pub ranges: &'a ColumnRanges,
}

impl FilterContext for WithColumnRanges<'_> {
    fn resolve_column(&self, name: &str) -> Option<ColumnKey> {
        self.base.resolve_column(name)
    }

    fn categorical(&self, key: ColumnKey) -> Option<CategoricalValues<'_>> {
        self.base
            .categorical(key)
            .or_else(|| self.ranges.categorical(key))
    }
}

/// Context without any categorical metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoColumnMetadata;

impl FilterContext for NoColumnMetadata {
    fn categorical(&self, _key: ColumnKey) -> Option<CategoricalValues<'_>> {
        None
    }
}
