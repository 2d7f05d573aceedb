//! Domain models for the CTest ingestion engine.

pub mod event;
pub mod failure;
pub mod session;
pub mod suite;
pub mod test_case;

// Re-export commonly used types
pub use event::TestEvent;
pub use failure::FailureLocation;
pub use session::{DiscoveredTest, RunSession};
pub use suite::{SiteInfo, TestSuiteResult, TestSummary};
pub use test_case::{TestCase, TestMeasurement, TestStatus};
