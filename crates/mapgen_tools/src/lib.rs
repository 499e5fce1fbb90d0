//! # Map Generator Tools
//!
//! Command-line tools for working with generated maps:
//! - Rendering a map as ASCII or exporting it as JSON
//! - Batch validation of many seeds in parallel

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod render;
pub mod validate;

use std::path::PathBuf;

use thiserror::Error;

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to read a configuration file.
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The configuration was rejected.
    #[error(transparent)]
    MapGen(#[from] mapgen_core::error::MapGenError),
    /// Failed to encode JSON output.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;
