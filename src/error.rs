//! Error types for the packing engine.
//!
//! Only conditions that make a run meaningless are errors. An item that finds
//! no container or an unpack naming an unknown item are ordinary outcomes and
//! are reported through [`crate::engine::PackingOutcome`] instead.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, PackingError>;

/// Errors that abort a packing run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackingError {
    /// Two coordinate tuples that must agree in length do not.
    #[error("Dimension mismatch in {context}: expected {expected} axes, got {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        context: String,
    },

    /// A length or coordinate is negative, NaN or infinite.
    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    /// Options that cannot be applied to the run.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl PackingError {
    pub(crate) fn dimension_mismatch(
        expected: usize,
        found: usize,
        context: impl Into<String>,
    ) -> Self {
        Self::DimensionMismatch {
            expected,
            found,
            context: context.into(),
        }
    }
}
