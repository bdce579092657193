// src/filter/evaluator.rs
//! Stateless predicate evaluation over a single row.
//!
//! Evaluation never fails: a filter that cannot apply to a row (text value
//! under a numeric comparator, unknown column, missing operands, no
//! categorical metadata) rejects the row.

use crate::core::{CellValue, ColumnKey};
use crate::filter::{CompositeFilter, Filter, FilterMethod};
use crate::traits::{CategoricalValues, FilterContext, RowAccess};

/// `true` iff the row passes every filter.
pub fn evaluate<R: RowAccess + ?Sized>(
    row: &R,
    filters: &[Filter],
    context: &dyn FilterContext,
) -> bool {
    filters
        .iter()
        .all(|filter| evaluate_filter(row, filter, context))
}

pub fn evaluate_filter<R: RowAccess + ?Sized>(
    row: &R,
    filter: &Filter,
    context: &dyn FilterContext,
) -> bool {
    let key = context.resolve_column(&filter.column);
    let value = key.and_then(|key| row.value(key));
    let arg = &filter.arg;

    match filter.method {
        FilterMethod::Equal => compare(value, arg, |v, a| v == a),
        FilterMethod::GreaterThan => compare(value, arg, |v, a| v > a),
        FilterMethod::GreaterThanEqualTo => compare(value, arg, |v, a| v >= a),
        FilterMethod::LessThan => compare(value, arg, |v, a| v < a),
        FilterMethod::LessThanEqualTo => compare(value, arg, |v, a| v <= a),
        FilterMethod::InTheRangeOf => {
            match (value.and_then(CellValue::as_number), arg.first(), arg.get(1)) {
                (Some(v), Some(&min), Some(&max)) => min <= v && v <= max,
                _ => false,
            }
        }
        FilterMethod::Includes => includes(value, key, arg, context),
        FilterMethod::Excludes => !includes(value, key, arg, context),
    }
}

fn compare(value: Option<CellValue<'_>>, arg: &[f64], test: impl Fn(f64, f64) -> bool) -> bool {
    match (value.and_then(CellValue::as_number), arg.first()) {
        (Some(v), Some(&a)) => test(v, a),
        _ => false,
    }
}

/// Membership of the row's category index in `arg`.
fn includes(
    value: Option<CellValue<'_>>,
    key: Option<ColumnKey>,
    arg: &[f64],
    context: &dyn FilterContext,
) -> bool {
    let (Some(value), Some(key)) = (value, key) else {
        return false;
    };
    let index = match context.categorical(key) {
        None => return false,
        Some(CategoricalValues::Indexed) => match value.as_number() {
            Some(index) => index,
            None => return false,
        },
        Some(CategoricalValues::Raw(values)) => {
            match values.iter().position(|candidate| value.matches_raw(candidate)) {
                Some(position) => position as f64,
                None => return false,
            }
        }
    };
    arg.contains(&index)
}

pub fn evaluate_composite<R: RowAccess + ?Sized>(
    row: &R,
    node: &CompositeFilter,
    context: &dyn FilterContext,
) -> bool {
    match node {
        CompositeFilter::Leaf(filter) => evaluate_filter(row, filter, context),
        CompositeFilter::And(children) => children
            .iter()
            .all(|child| evaluate_composite(row, child, context)),
        CompositeFilter::Or(children) => children
            .iter()
            .any(|child| evaluate_composite(row, child, context)),
    }
}

/// AND over a list of composite trees; vacuously true when empty.
pub fn evaluate_composite_list<R: RowAccess + ?Sized>(
    row: &R,
    nodes: &[CompositeFilter],
    context: &dyn FilterContext,
) -> bool {
    nodes
        .iter()
        .all(|node| evaluate_composite(row, node, context))
}
