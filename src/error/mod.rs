//! Error handling module for Parca
//!
//! Errors here abort a whole batch. Problems scoped to one line, range or
//! job are collected as values instead (see `domain::errors`).

use std::path::PathBuf;

use thiserror::Error;

/// Batch-fatal error type
#[derive(Error, Debug)]
pub enum ParcaError {
    /// The source duration could not be determined
    #[error("Failed to probe {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// An external tool is not installed or not on PATH
    #[error("{tool} not found; install it or put it on PATH")]
    ToolNotFound { tool: String },

    /// Invalid configuration file or override
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Invalid command-line argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Nothing to cut
    #[error("No usable time ranges were given")]
    NoRanges,

    /// Batch driver died before producing a report
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Parca operations
pub type ParcaResult<T> = std::result::Result<T, ParcaError>;
