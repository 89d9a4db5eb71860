//! Error types for navspy_core

use thiserror::Error;

/// Errors raised while building geometry or observer options
///
/// Runtime event handling never fails; these only come out of constructors
/// and parsers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A length literal was not `<n>px`, `<n>%` or `0`
    #[error("invalid length '{0}': expected '<n>px', '<n>%' or '0'")]
    InvalidLength(String),

    /// A margin shorthand did not have 1 to 4 components
    #[error("invalid margin '{0}': expected 1 to 4 lengths")]
    InvalidMargin(String),

    /// An intersection threshold was outside `[0, 1]` or not a number
    #[error("intersection threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f32),
}

/// Result type for navspy_core operations
pub type Result<T> = std::result::Result<T, CoreError>;
