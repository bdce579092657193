// src/core/errors.rs
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CohortError {
    InvalidInput(String),
    IncompatibleDimensions(String),
    UnknownColumn(String),
    InvalidOperation(String),
    NdarrayError(String),
}

impl fmt::Display for CohortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortError::InvalidInput(msg) => write!(f, "Invalid Input: {}", msg),
            CohortError::IncompatibleDimensions(msg) => write!(f, "Incompatible Dimensions: {}", msg),
            CohortError::UnknownColumn(msg) => write!(f, "Unknown Column: {}", msg),
            CohortError::InvalidOperation(msg) => write!(f, "Invalid Operation: {}", msg),
            CohortError::NdarrayError(msg) => write!(f, "Ndarray Error: {}", msg),
        }
    }
}

impl std::error::Error for CohortError {}

impl From<ndarray::ShapeError> for CohortError {
    fn from(err: ndarray::ShapeError) -> Self {
        CohortError::NdarrayError(format!("ndarray ShapeError: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CohortError>;
