//! Error types for the cable_core library.

use std::io;

use crate::CableFamily;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cable_core operations
///
/// An infeasible core-count solve is not an error; see [`crate::CoreSolution`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The (family, gauge) pair is not in the catalog
    #[error("Conductor not found: no '{gauge_id}' in the {family} family")]
    NotFound {
        family: CableFamily,
        gauge_id: String,
    },

    /// A calculation input is non-physical (negative, NaN, out of range)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Preset management error
    #[error("Preset error: {0}")]
    Preset(String),
}

impl Error {
    pub(crate) fn invalid_input(field: &'static str, value: f64, reason: &'static str) -> Self {
        Error::InvalidInput {
            field,
            value: value.to_string(),
            reason,
        }
    }
}
