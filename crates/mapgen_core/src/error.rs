//! Error types for map generation.
//!
//! Generation itself never fails once a configuration is accepted; errors
//! only arise at the configuration boundary.

use thiserror::Error;

/// Result type alias using [`MapGenError`].
pub type Result<T> = std::result::Result<T, MapGenError>;

/// A configuration value that was rejected. The previous value is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Map dimensions too small to hold anything, or too large to index.
    #[error("Map dimensions {width}x{height} are outside {min}..={max} per edge")]
    Dimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Minimum edge length.
        min: u32,
        /// Maximum edge length.
        max: u32,
    },

    /// Terrain percentages must add up to at most 100.
    #[error("Terrain percentages sum to {total}%, which exceeds 100%")]
    PercentageOverflow {
        /// Sum the rejected value would have produced.
        total: u32,
    },

    /// A field that must be strictly positive was zero.
    #[error("{field} must be greater than zero")]
    NotPositive {
        /// Field name.
        field: &'static str,
    },

    /// A value outside its permitted range.
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Inclusive lower bound.
        min: u32,
        /// Inclusive upper bound.
        max: u32,
    },
}

/// Top-level error type for the generator.
#[derive(Debug, Error)]
pub enum MapGenError {
    /// A configuration value failed validation.
    #[error("Invalid map configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A configuration file could not be parsed.
    #[error("Failed to parse map configuration: {0}")]
    ConfigParse(String),
}
