//! Centralized error types for mailscope.

use thiserror::Error;

/// All errors produced by the mailscope library.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The message source could not open the requested folder.
    #[error("Cannot open folder '{folder}': {reason}")]
    SourceOpen { folder: String, reason: String },

    /// The message source failed mid-stream. Fatal to the job.
    #[error("Message source failed after {processed} messages: {reason}")]
    SourceRead { processed: u64, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The overall job deadline expired before the stream was exhausted.
    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),

    /// The job was cancelled by an external request.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A job with this identifier is already running.
    #[error("Job '{0}' is already running")]
    JobAlreadyRunning(String),

    /// No job with this identifier exists in the registry.
    #[error("Job '{0}' not found")]
    JobNotFound(String),

    /// The report was requested before the job reached `completed`.
    #[error("Job '{id}' has no report (state: {state})")]
    ReportNotReady { id: String, state: String },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for `Result<T, AnalyzerError>`.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
