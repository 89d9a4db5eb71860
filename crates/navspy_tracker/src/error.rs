//! Error types for navspy_tracker
//!
//! Only construction can fail. Once mounted, the tracker absorbs every
//! condition (unresolved sections, event bursts, late callbacks) locally.

use thiserror::Error;

/// Errors building a section list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    #[error("section id at position {0} is empty")]
    EmptyId(usize),

    #[error("duplicate section id '{0}'")]
    Duplicate(String),
}

/// Errors loading or validating a tracker configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Thresholds must be within `[0, 1]`
    #[error("threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f32),

    /// Thresholds must be listed in ascending order
    #[error("thresholds must be ascending")]
    ThresholdsUnsorted,

    #[error("retry interval must be positive")]
    ZeroRetryInterval,

    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidDimension { field: &'static str, value: f32 },

    #[error(transparent)]
    Core(#[from] navspy_core::CoreError),

    #[error("failed to parse tracker config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Either kind of construction error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for navspy_tracker configuration
pub type Result<T> = std::result::Result<T, ConfigError>;
