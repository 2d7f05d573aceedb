//! Transient per-invocation session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A test discovered by the listing command (`Test #<id>: <name>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTest {
    /// 1-based test id as printed by the runner
    pub id: u32,
    /// Test name
    pub name: String,
}

/// State for one discovery/run invocation.
///
/// Created fresh per invocation and discarded afterwards; the run tag
/// selects the results subdirectory CTest wrote for this invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSession {
    /// Build directory the runner operates in
    pub binary_dir: PathBuf,
    /// Active build configuration (e.g. "Debug")
    pub build_configuration: String,
    /// Run tag read from the TAG marker file, when present
    pub tag: Option<String>,
    /// Resolved path of the results document, when a tag exists
    pub results_file: Option<PathBuf>,
    /// Session start time
    pub started_at: DateTime<Utc>,
}

impl RunSession {
    /// Create a session by reading the TAG marker under `<binary_dir>/Testing`.
    ///
    /// The first line of the TAG file is the run identifier; the results
    /// document for that run lives at `Testing/<tag>/Test.xml`. A missing or
    /// empty TAG file is a normal state (no results yet) and yields a session
    /// without a results path.
    pub async fn locate(binary_dir: &Path, build_configuration: &str) -> Self {
        let tag_file = binary_dir.join("Testing").join("TAG");
        let tag = match tokio::fs::read_to_string(&tag_file).await {
            Ok(content) => content
                .lines()
                .next()
                .map(|l| l.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(_) => None,
        };

        let results_file = tag
            .as_ref()
            .map(|t| binary_dir.join("Testing").join(t).join("Test.xml"));

        debug!(
            "Session for {:?}: tag={:?} results_file={:?}",
            binary_dir, tag, results_file
        );

        RunSession {
            binary_dir: binary_dir.to_path_buf(),
            build_configuration: build_configuration.to_string(),
            tag,
            results_file,
            started_at: Utc::now(),
        }
    }
}
