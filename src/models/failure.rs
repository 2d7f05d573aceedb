//! Failure location model produced by scanning failed-test output.

use serde::{Deserialize, Serialize};

/// A localized failing assertion extracted from captured test output.
///
/// Produced only from failed tests. `file_name` is kept exactly as
/// reported by the runner and may be relative to the build directory;
/// resolution happens in the decoration index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLocation {
    /// File name as reported, possibly relative
    pub file_name: String,
    /// 0-based line number (converted from the 1-based display number)
    pub line_number: u32,
    /// Fenced text block shown on hover over the annotated line
    pub hover_message: String,
}
