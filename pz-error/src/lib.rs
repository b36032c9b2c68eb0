//! Unified error handling for pinzone
//!
//! This crate provides a single error type used across all pinzone components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using PinzoneError
pub type Result<T> = std::result::Result<T, PinzoneError>;

/// Unified error type for all pinzone operations
#[derive(thiserror::Error, Debug)]
pub enum PinzoneError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration and Settings Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid value for form field {field}: {reason}")]
    InvalidFormField {
        field: String,
        reason: String,
    },

    #[error("Duplicate order values detected: {}", join_values(.values))]
    DuplicateOrder {
        values: Vec<u32>,
    },

    #[error("Invalid physical pin: {0} (must be 1-40)")]
    InvalidPin(u8),

    // ============================================================================
    // GPIO Line Errors
    // ============================================================================
    #[error("Failed to request GPIO{line}: {reason}")]
    LineRequest {
        line: u32,
        reason: String,
    },

    #[error("Failed to release GPIO{line}: {reason}")]
    LineRelease {
        line: u32,
        reason: String,
    },

    #[error("Failed to update GPIO{line}: {reason}")]
    LineWrite {
        line: u32,
        reason: String,
    },

    // ============================================================================
    // Daemon and IPC Errors
    // ============================================================================
    #[error("Daemon connection failed: {0}")]
    DaemonConnection(String),

    #[error("IPC protocol error: {0}")]
    IpcProtocol(String),

    #[error("Message too large: {size} bytes (max {max_size} bytes)")]
    MessageTooLarge {
        size: usize,
        max_size: usize,
    },
}

fn join_values(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PinzoneError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a form validation error
    pub fn form_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by user input rather than the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormField { .. } | Self::DuplicateOrder { .. } | Self::InvalidPin(_)
        )
    }
}
