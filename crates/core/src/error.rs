// crates/core/src/error.rs
use thiserror::Error;

/// Errors produced while validating a sample or folding it into a record.
#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Estimate for {name} produced a non-finite {quantity}")]
    NonFinite { name: String, quantity: &'static str },
}

impl ProgressError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
