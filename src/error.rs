//! Error types for the Voltlab simulation engine.
//!
//! This module provides a unified error type [`VoltlabError`] for the edges
//! of the engine: loading and validating configuration, exporting history,
//! and misuse of the history buffer. The tick path itself never fails;
//! degenerate numeric states are repaired in place and logged.

use thiserror::Error;

/// Result type alias using [`VoltlabError`].
pub type Result<T> = std::result::Result<T, VoltlabError>;

/// Unified error type for all Voltlab operations.
#[derive(Error, Debug)]
pub enum VoltlabError {
    // ============ Configuration Errors ============
    /// A configuration field holds a value the engine cannot use as-is
    #[error("Invalid configuration field '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Error reading a configuration file
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration JSON could not be decoded
    #[error("Failed to parse config: {source}")]
    ConfigParse {
        #[from]
        source: serde_json::Error,
    },

    // ============ History Errors ============
    /// A sample was appended whose index does not follow the latest one
    #[error("Sample index {got} does not follow latest index {last}")]
    OutOfOrderSample { last: u64, got: u64 },

    // ============ Export Errors ============
    /// A sample could not be rendered for export
    #[error("Export error: {message}")]
    Export { message: String },

    /// Error writing an export file
    #[error("Failed to write export file '{path}': {source}")]
    ExportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ Scheduler Errors ============
    /// The host refused to release a frame registration
    #[error("Scheduler teardown failed: {message}")]
    SchedulerTeardown { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl VoltlabError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Create a scheduler teardown error
    pub fn teardown(message: impl Into<String>) -> Self {
        Self::SchedulerTeardown {
            message: message.into(),
        }
    }
}
