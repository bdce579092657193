pub mod dataset_cohort;
pub mod stats;

pub use dataset_cohort::{Cohort, CohortDefinition};
pub use stats::CohortStats;
