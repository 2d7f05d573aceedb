//! Domain error types for the CTest ingestion engine.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

/// Ingestion-level errors.
///
/// Errors raised while parsing a results document (`Parse`, `Schema`,
/// `UnsupportedFormat`) are caught at the run-coordinator boundary, logged
/// with the offending file or node, and degrade to an empty result set.
/// They never escape `run_all`/`discover_tests`/`ingest_results`.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Results document could not be parsed at all
    #[error("Malformed results document: {0}")]
    Parse(String),

    /// A required field or attribute was absent from the results document
    #[error("Results document schema violation: {0}")]
    Schema(String),

    /// Unknown encoding/compression token, scoped to a single measurement
    #[error("Unsupported measurement format: {0}")]
    UnsupportedFormat(String),

    /// The external test binary could not be launched
    #[error("Failed to launch '{program}': {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Abort was requested mid-run
    #[error("Test run was cancelled")]
    Cancelled,

    /// A second `run_all` was invoked while one is in flight
    #[error("A test run is already in progress")]
    AlreadyRunning,

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with IngestError.
pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    /// True for errors that invalidate only one measurement, not the document.
    pub fn is_measurement_scoped(&self) -> bool {
        matches!(self, IngestError::UnsupportedFormat(_))
    }
}
