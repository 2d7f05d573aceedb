//! Change-notification event types emitted after each reload cycle.

use serde::{Deserialize, Serialize};

use super::session::DiscoveredTest;
use super::suite::TestSummary;

/// Notification sent to subscribed consumers.
///
/// Every reload cycle emits its events exactly once, even when the values
/// are unchanged; consumers rely on this to know a refresh completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum TestEvent {
    /// The discovered test list was replaced.
    TestsChanged(Vec<DiscoveredTest>),
    /// The current results summary was replaced (None = results cleared).
    ResultsChanged(Option<TestSummary>),
    /// Testing became enabled or disabled for the build directory.
    TestingEnabledChanged(bool),
}
