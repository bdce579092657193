pub mod evaluator;
pub mod model;
pub mod ranges;

pub use evaluator::{evaluate, evaluate_composite, evaluate_composite_list, evaluate_filter};
pub use model::{CompositeFilter, Filter, FilterMethod, Operation};
pub use ranges::{ColumnRange, ColumnRanges, NoColumnMetadata, WithColumnRanges};
