//! Error types for the Veristamp attestation pipeline.
//!
//! Errors are organized by stage so a failed capture can be traced back to
//! the step that produced it. Network outcomes (transport failures and
//! server rejections) are not errors here: they are values of
//! [`AttestationOutcome`](crate::types::AttestationOutcome).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Veristamp operations.
#[derive(Error, Debug)]
pub enum VeristampError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The persistence sink failed to store a result
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Local processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source image could not be read, decoded or re-encoded
    #[error("Codec error for {path}: {message}")]
    Codec { path: PathBuf, message: String },

    /// Source file exceeds the upload size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The attestation payload cannot be rendered as a QR code
    #[error("Code generation failed: {message}")]
    CodeGeneration { message: String },

    /// Overlaying the code onto the photo failed
    #[error("Composition failed: {message}")]
    Composition { message: String },

    /// A blocking stage task panicked or was aborted
    #[error("Task failure in {stage} stage: {message}")]
    Task { stage: String, message: String },
}

impl PipelineError {
    /// Whether this error belongs to the encoding stage (read, decode, re-encode).
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            PipelineError::Codec { .. }
                | PipelineError::FileTooLarge { .. }
                | PipelineError::FileNotFound(_)
        )
    }
}

/// Errors surfaced by a [`PersistenceSink`](crate::persist::PersistenceSink).
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The output location could not be prepared or written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The composited image could not be encoded for storage
    #[error("Failed to encode output image: {0}")]
    Encode(String),
}

/// Convenience type alias for Veristamp results.
pub type Result<T> = std::result::Result<T, VeristampError>;

/// Convenience type alias for pipeline-stage results.
pub type StageResult<T> = std::result::Result<T, PipelineError>;
