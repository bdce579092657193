pub mod columns;
pub mod data;
pub mod errors;

pub use columns::*;
pub use data::*; // Re-export common data types
pub use errors::*;
