//! Normalized results document model.

use serde::{Deserialize, Serialize};

use super::test_case::{TestCase, TestStatus};

/// Site metadata from the root element of a results document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Build name (e.g. "Linux-c++")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    /// Build stamp, which embeds the run tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_stamp: Option<String>,
    /// Host name of the site that ran the tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    /// Generator string (e.g. "ctest-3.28.1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

/// Aggregate pass/fail counts for one ingested results document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub passing: usize,
    pub total: usize,
}

/// A fully normalized results document.
///
/// `test_list` reflects discovery order and is independent of the ordering
/// of `tests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteResult {
    /// Site metadata
    pub site: SiteInfo,
    /// Declared test names in discovery order
    pub test_list: Vec<String>,
    /// Individual test executions in document order
    pub tests: Vec<TestCase>,
}

impl TestSuiteResult {
    /// Summarize pass counts over the document's test entries.
    pub fn summary(&self) -> TestSummary {
        let passing = self
            .tests
            .iter()
            .filter(|t| t.status == TestStatus::Passed)
            .count();
        TestSummary {
            passing,
            total: self.tests.len(),
        }
    }

    /// Iterate over the failed tests only.
    pub fn failed_tests(&self) -> impl Iterator<Item = &TestCase> {
        self.tests.iter().filter(|t| t.status == TestStatus::Failed)
    }
}
