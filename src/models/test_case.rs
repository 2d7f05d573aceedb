//! Test case model representing one ingested test execution.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Test execution status as reported in the results document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Failed,
    #[serde(rename = "notrun")]
    NotRun,
    Passed,
}

impl TestStatus {
    /// Convert to the document string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::NotRun => "notrun",
            Self::Passed => "passed",
        }
    }

    /// Parse from the document string representation.
    ///
    /// Unknown status strings are treated as failed; an *absent* Status
    /// attribute is a schema violation handled by the normalizer instead.
    pub fn parse(s: &str) -> Self {
        match s {
            "failed" => Self::Failed,
            "notrun" => Self::NotRun,
            "passed" => Self::Passed,
            _ => {
                warn!("Unknown test status '{}', treating as failed", s);
                Self::Failed
            }
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named measurement attached to a test (execution time, exit value, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMeasurement {
    /// Measurement value type as declared in the document (e.g. "numeric/double")
    pub measurement_type: String,
    /// Measurement name (e.g. "Execution Time")
    pub name: String,
    /// Raw measurement value
    pub value: String,
}

/// One test execution from an ingested results document.
///
/// Immutable after creation; a reload replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Short test name
    pub name: String,
    /// Fully qualified test name
    pub full_name: String,
    /// Command line the runner executed for this test
    pub full_command_line: String,
    /// Path of the test within the project
    pub path: String,
    /// Execution status
    pub status: TestStatus,
    /// Captured stdout+stderr of the test run, already decoded
    pub output: String,
    /// Named measurements in document order
    pub measurements: Vec<TestMeasurement>,
}

impl TestCase {
    /// Look up a measurement value by name.
    pub fn measurement(&self, name: &str) -> Option<&str> {
        self.measurements
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }
}
