// src/traits.rs

use crate::core::{CellValue, ColumnKey, RawValue};
use crate::metrics::{ObjectDetectionRequest, ObjectDetectionScores, QuestionAnsweringScores};
use std::collections::BTreeMap;

/// Read access to one row, by column key.
pub trait RowAccess {
    fn value(&self, key: ColumnKey) -> Option<CellValue<'_>>;
}

impl RowAccess for BTreeMap<ColumnKey, RawValue> {
    fn value(&self, key: ColumnKey) -> Option<CellValue<'_>> {
        self.get(&key).map(RawValue::as_cell)
    }
}

/// How the category index of a row value is found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoricalValues<'a> {
    /// The row stores the category index itself.
    Indexed,
    /// The row stores the raw value; its position in this list is the index.
    Raw(&'a [RawValue]),
}

/// Column metadata consulted while evaluating filters.
pub trait FilterContext {
    /// Maps a filter's column name onto a row key.
    fn resolve_column(&self, name: &str) -> Option<ColumnKey> {
        name.parse().ok()
    }

    /// `None` when the column has no categorical metadata.
    fn categorical(&self, key: ColumnKey) -> Option<CategoricalValues<'_>>;
}

/// Pre-computed object-detection scores, supplied by the backend.
pub trait ObjectDetectionCache {
    fn lookup(
        &self,
        selection: &[usize],
        request: &ObjectDetectionRequest,
    ) -> Option<ObjectDetectionScores>;
}

/// Pre-computed question-answering scores, supplied by the backend.
pub trait QuestionAnsweringCache {
    fn lookup(&self, selection: &[usize]) -> Option<QuestionAnsweringScores>;
}
