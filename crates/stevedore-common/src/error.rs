//! Unified error types for the Stevedore workspace.
//!
//! The conversion engine distinguishes three failure classes: structural
//! errors (the document envelope does not match the schema), field-level
//! errors (a single value has the wrong shape for its codec), and lookup
//! errors (a format name with no registered transformer). Lossy-but-valid
//! conversions are never errors; they are reported through `tracing`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StevedoreError {
    /// The raw document's top-level shape does not match the schema's
    /// expected envelope. Aborts the whole conversion.
    #[error("unsupported document: {reason}")]
    UnsupportedDocument {
        /// Description of the missing or malformed envelope element.
        reason: String,
    },

    /// A single field's raw value has the wrong shape for its codec.
    /// Strict-fail: the conversion aborts rather than dropping the field.
    #[error("malformed field \"{field}\": cannot convert value {value}")]
    MalformedField {
        /// Canonical name of the offending field.
        field: String,
        /// Rendering of the offending raw value.
        value: String,
    },

    /// A conversion was requested for a format with no registered
    /// transformer.
    #[error("no transformer registered for format \"{format}\"")]
    UnknownTransformer {
        /// The unrecognized format name.
        format: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the underlying serializer failure.
        message: String,
    },
}

impl From<serde_json::Error> for StevedoreError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization {
            message: source.to_string(),
        }
    }
}

impl StevedoreError {
    /// Builds an [`StevedoreError::UnsupportedDocument`] from a
    /// displayable reason.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedDocument {
            reason: reason.into(),
        }
    }

    /// Builds a [`StevedoreError::MalformedField`] for a field and the
    /// offending raw value.
    #[must_use]
    pub fn malformed(field: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self::MalformedField {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StevedoreError>;
