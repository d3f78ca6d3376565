//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode between reading the command
//! line and printing a result.

use std::path::PathBuf;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific failure, providing a single error type
/// that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The command line was malformed.
    #[error("usage: ecosim-engine <scenario.json> [config.yaml] ({message})")]
    Usage {
        /// What was wrong with the arguments.
        message: String,
    },

    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ecosim_core::config::ConfigError,
    },

    /// The scenario file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        /// The scenario path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The scenario was not a valid attempt payload.
    #[error("failed to parse scenario: {source}")]
    Parse {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The evaluation produced no result.
    #[error("evaluation error [{}]: {source}", .source.code())]
    Evaluation {
        /// The underlying evaluation error.
        #[from]
        source: ecosim_core::EvaluationError,
    },
}
