// src/filter/model.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMethod {
    #[serde(rename = "equal")]
    Equal,
    #[serde(rename = "greater")]
    GreaterThan,
    #[serde(rename = "greater or equal")]
    GreaterThanEqualTo,
    #[serde(rename = "less")]
    LessThan,
    #[serde(rename = "less or equal")]
    LessThanEqualTo,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = "excludes")]
    Excludes,
    #[serde(rename = "in the range of")]
    InTheRangeOf,
}

/// A single predicate over one column.
///
/// `arg` holds the operands: one threshold for comparisons, `[min, max]` for
/// ranges, category indexes for `Includes`/`Excludes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub method: FilterMethod,
    pub arg: Vec<f64>,
}

impl Filter {
    pub fn new(column: impl Into<String>, method: FilterMethod, arg: Vec<f64>) -> Self {
        Filter {
            column: column.into(),
            method,
            arg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    And,
    Or,
}

/// Recursive boolean tree of filters.
///
/// On the wire a node is either a plain filter or
/// `{"operation": "and" | "or", "compositeFilters": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CompositeFilterRepr", into = "CompositeFilterRepr")]
pub enum CompositeFilter {
    Leaf(Filter),
    And(Vec<CompositeFilter>),
    Or(Vec<CompositeFilter>),
}

impl CompositeFilter {
    pub fn leaf(filter: Filter) -> Self {
        CompositeFilter::Leaf(filter)
    }

    pub fn node(operation: Operation, children: Vec<CompositeFilter>) -> Self {
        match operation {
            Operation::And => CompositeFilter::And(children),
            Operation::Or => CompositeFilter::Or(children),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            CompositeFilter::Leaf(_) => 1,
            CompositeFilter::And(children) | CompositeFilter::Or(children) => {
                1 + children.iter().map(CompositeFilter::depth).max().unwrap_or(0)
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CompositeFilterRepr {
    Node {
        operation: Operation,
        #[serde(rename = "compositeFilters")]
        composite_filters: Vec<CompositeFilter>,
    },
    Leaf(Filter),
}

impl From<CompositeFilterRepr> for CompositeFilter {
    fn from(repr: CompositeFilterRepr) -> Self {
        match repr {
            CompositeFilterRepr::Node {
                operation,
                composite_filters,
            } => CompositeFilter::node(operation, composite_filters),
            CompositeFilterRepr::Leaf(filter) => CompositeFilter::Leaf(filter),
        }
    }
}

impl From<CompositeFilter> for CompositeFilterRepr {
    fn from(filter: CompositeFilter) -> Self {
        match filter {
            CompositeFilter::Leaf(filter) => CompositeFilterRepr::Leaf(filter),
            CompositeFilter::And(children) => CompositeFilterRepr::Node {
                operation: Operation::And,
                composite_filters: children,
            },
            CompositeFilter::Or(children) => CompositeFilterRepr::Node {
                operation: Operation::Or,
                composite_filters: children,
            },
        }
    }
}
