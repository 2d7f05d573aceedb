//! CTest ingestion and failure-localization engine.
//!
//! This library ingests results produced by a CTest-style native test
//! driver (Test.xml plus the TAG marker), normalizes them into a typed
//! model, localizes failing Catch assertions to file/line positions, and
//! coordinates discover → run → ingest → notify cycles for an embedding
//! build/test orchestration tool.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{IngestError, IngestResult};
pub use services::{CoordinatorState, RunCoordinator};

/// Initialize a fmt tracing subscriber honoring `RUST_LOG`.
///
/// Convenience for embedding binaries; libraries and tests that install
/// their own subscriber can skip this. Calling it twice is harmless.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
