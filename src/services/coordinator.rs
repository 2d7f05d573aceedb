//! Run coordinator sequencing discovery, execution, ingestion, and
//! change notification.
//!
//! A coordinator instance is explicitly constructed and owned by its
//! caller; there is no global state, so multiple independent test sessions
//! can coexist. All mutating operations are serialized on the instance;
//! read accessors observe atomic snapshots and never tear.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::models::{
    DiscoveredTest, FailureLocation, RunSession, TestEvent, TestSuiteResult, TestSummary,
};

use super::catch_scanner::scan_test_output;
use super::decoration_index::{Annotation, DecorationIndex};
use super::event_broadcaster::EventBroadcaster;
use super::process::{CancelFlag, ExecOptions, LoggingOutputConsumer, ProcessRunner};
use super::results_xml::parse_results_document;

/// Marker file CTest writes into configured build directories.
const CTEST_TESTFILE: &str = "CTestTestfile.cmake";

/// Listing line printed by `ctest -N`: `Test #<id>: <name>`.
static TEST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Test\s*#(\d+):\s*(.*)$").expect("valid regex"));

/// Lifecycle of a coordinator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Discovering,
    Ready,
    Running,
    ResultsAvailable,
}

/// The externally visible triple swapped atomically on every reload.
#[derive(Default)]
struct Snapshot {
    testing_enabled: bool,
    tests: Vec<DiscoveredTest>,
    results: Option<TestSuiteResult>,
    failures: Vec<FailureLocation>,
    index: DecorationIndex,
}

/// Sequences discover → run → ingest → notify cycles for one build
/// directory at a time.
pub struct RunCoordinator {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
    events: EventBroadcaster,
    cancel: CancelFlag,
    state: Mutex<CoordinatorState>,
    /// Serializes discovery/ingestion so they never interleave.
    op_lock: AsyncMutex<()>,
    snapshot: RwLock<Snapshot>,
}

impl RunCoordinator {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: Config) -> Self {
        RunCoordinator {
            config,
            runner,
            events: EventBroadcaster::new(),
            cancel: CancelFlag::new(),
            state: Mutex::new(CoordinatorState::Idle),
            op_lock: AsyncMutex::new(()),
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Subscribe to reload notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> CoordinatorState {
        *lock_recovering(&self.state)
    }

    pub fn testing_enabled(&self) -> bool {
        read_recovering(&self.snapshot).testing_enabled
    }

    /// Most recent discovered test list.
    pub fn tests(&self) -> Vec<DiscoveredTest> {
        read_recovering(&self.snapshot).tests.clone()
    }

    /// Most recent ingested results, if any.
    pub fn test_results(&self) -> Option<TestSuiteResult> {
        read_recovering(&self.snapshot).results.clone()
    }

    pub fn summary(&self) -> Option<TestSummary> {
        read_recovering(&self.snapshot)
            .results
            .as_ref()
            .map(|r| r.summary())
    }

    /// Current aggregate failure-location set.
    pub fn failure_locations(&self) -> Vec<FailureLocation> {
        read_recovering(&self.snapshot).failures.clone()
    }

    /// Failure annotations for an absolute file path, for the renderer.
    pub fn annotations_for(&self, path: &Path) -> Vec<Annotation> {
        read_recovering(&self.snapshot).index.annotations_for(path)
    }

    /// Request best-effort termination of the running child process.
    ///
    /// The in-flight `run_all` returns to Ready without ingesting partial
    /// output; an already-written results file is only picked up by the
    /// next explicit reload.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Reload the list of tests for a build directory.
    ///
    /// A build directory without a `CTestTestfile.cmake` has testing
    /// disabled; that is a normal state, not an error. Failures running
    /// the listing command degrade to an empty list. Never returns an
    /// ingestion error. `build_configuration` defaults to the configured
    /// one when not given.
    pub async fn discover_tests(
        &self,
        binary_dir: &Path,
        build_configuration: Option<&str>,
    ) -> IngestResult<Vec<DiscoveredTest>> {
        let _guard = self.op_lock.lock().await;
        let build_configuration = self.resolve_build_configuration(build_configuration);
        self.discover_locked(binary_dir, &build_configuration).await
    }

    /// Run the whole suite, then reload tests and results.
    ///
    /// Rejects with [`IngestError::AlreadyRunning`] while a run is in
    /// flight. Partial test failure is expected and not exceptional: the
    /// reload happens regardless of exit code, and the exit code is
    /// returned as-is. A signal-terminated, launch-failed, or cancelled
    /// run is reported as -1. Parallelism comes from the configured job
    /// count; `build_configuration` defaults to the configured one.
    pub async fn run_all(
        &self,
        binary_dir: &Path,
        build_configuration: Option<&str>,
        extra_args: &[String],
    ) -> IngestResult<i32> {
        {
            let mut state = lock_recovering(&self.state);
            if *state == CoordinatorState::Running {
                return Err(IngestError::AlreadyRunning);
            }
            *state = CoordinatorState::Running;
        }
        self.cancel.reset();

        let build_configuration = self.resolve_build_configuration(build_configuration);
        let args = self.run_args(&build_configuration, extra_args);

        let options = ExecOptions {
            cwd: Some(binary_dir.to_path_buf()),
            env: self.config.test_environment.clone(),
            cancel: Some(self.cancel.clone()),
        };

        let outcome = self
            .runner
            .execute(
                &self.config.ctest_path,
                &args,
                options,
                Some(Arc::new(LoggingOutputConsumer)),
            )
            .await;

        let exit_code = match outcome {
            Ok(output) => match output.exit_code {
                Some(code) => {
                    info!("Test run finished with return code {}", code);
                    code
                }
                None => {
                    info!("Test run was terminated");
                    -1
                }
            },
            Err(IngestError::Cancelled) => {
                warn!("Test run cancelled; skipping ingestion of partial output");
                self.set_state(CoordinatorState::Ready);
                return Ok(-1);
            }
            Err(e) => {
                error!("Failed to launch test run in {:?}: {}", binary_dir, e);
                self.set_state(CoordinatorState::Ready);
                return Ok(-1);
            }
        };

        let _guard = self.op_lock.lock().await;
        self.discover_locked(binary_dir, &build_configuration).await?;
        Ok(exit_code)
    }

    /// Reload results for a build directory without re-running tests.
    ///
    /// A missing TAG marker or results file clears prior results without
    /// error; malformed XML is caught, logged, and substitutes an empty
    /// result.
    pub async fn ingest_results(
        &self,
        binary_dir: &Path,
        build_configuration: Option<&str>,
    ) -> IngestResult<()> {
        let _guard = self.op_lock.lock().await;
        let build_configuration = self.resolve_build_configuration(build_configuration);
        let session = RunSession::locate(binary_dir, &build_configuration).await;
        self.ingest_locked(&session).await;
        if self.state() != CoordinatorState::Running {
            self.refresh_state_from_snapshot();
        }
        Ok(())
    }

    async fn discover_locked(
        &self,
        binary_dir: &Path,
        build_configuration: &str,
    ) -> IngestResult<Vec<DiscoveredTest>> {
        self.set_state(CoordinatorState::Discovering);

        let testfile = binary_dir.join(CTEST_TESTFILE);
        if !tokio::fs::try_exists(&testfile).await.unwrap_or(false) {
            info!(
                "No {} in {:?}, testing is disabled for this build directory",
                CTEST_TESTFILE, binary_dir
            );
            {
                let mut snapshot = write_recovering(&self.snapshot);
                snapshot.testing_enabled = false;
                snapshot.tests = Vec::new();
            }
            self.events.send(TestEvent::TestingEnabledChanged(false));
            self.events.send(TestEvent::TestsChanged(Vec::new()));
            self.set_state(CoordinatorState::Ready);
            return Ok(Vec::new());
        }

        let args = vec![
            "-N".to_string(),
            "-C".to_string(),
            build_configuration.to_string(),
        ];
        let options = ExecOptions {
            cwd: Some(binary_dir.to_path_buf()),
            env: self.config.test_environment.clone(),
            cancel: None,
        };

        let tests = match self
            .runner
            .execute(&self.config.ctest_path, &args, options, None)
            .await
        {
            Ok(output) if output.exit_code == Some(0) => parse_test_lines(&output.stdout),
            Ok(output) => {
                error!(
                    "Test listing in {:?} exited with {:?}; assuming no tests",
                    binary_dir, output.exit_code
                );
                Vec::new()
            }
            Err(e) => {
                error!("Failed to run test listing in {:?}: {}", binary_dir, e);
                Vec::new()
            }
        };

        let session = RunSession::locate(binary_dir, build_configuration).await;
        {
            let mut snapshot = write_recovering(&self.snapshot);
            snapshot.testing_enabled = true;
            snapshot.tests = tests.clone();
        }
        self.events.send(TestEvent::TestingEnabledChanged(true));
        self.events.send(TestEvent::TestsChanged(tests.clone()));

        self.ingest_locked(&session).await;
        self.refresh_state_from_snapshot();
        Ok(tests)
    }

    /// Load, normalize, and scan the session's results document, then swap
    /// the visible results and failure set atomically. The decoration index
    /// is re-based onto the session's build directory so relative failure
    /// paths resolve there. Fires exactly one `ResultsChanged` per call,
    /// even when the values are unchanged.
    async fn ingest_locked(&self, session: &RunSession) {
        let loaded = match &session.results_file {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(content) => match parse_results_document(&content) {
                    Ok(suite) => Some(suite),
                    Err(e) => {
                        error!("Failed to parse results document {:?}: {}", path, e);
                        None
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("No results at {:?}, clearing previous results", path);
                    None
                }
                Err(e) => {
                    error!("Failed to read results document {:?}: {}", path, e);
                    None
                }
            },
            None => {
                info!(
                    "No TAG marker under {:?}, clearing previous results",
                    session.binary_dir
                );
                None
            }
        };

        let failures: Vec<FailureLocation> = loaded
            .as_ref()
            .map(|suite| {
                suite
                    .failed_tests()
                    .flat_map(|t| scan_test_output(&t.output))
                    .collect()
            })
            .unwrap_or_default();
        let summary = loaded.as_ref().map(|suite| suite.summary());

        {
            let mut snapshot = write_recovering(&self.snapshot);
            snapshot.index.set_base_dir(session.binary_dir.clone());
            snapshot.results = loaded;
            snapshot.failures = failures.clone();
            snapshot.index.set_failures(failures);
        }
        self.events.send(TestEvent::ResultsChanged(summary));
    }

    fn resolve_build_configuration(&self, requested: Option<&str>) -> String {
        requested
            .unwrap_or(&self.config.build_configuration)
            .to_string()
    }

    /// Argument vector for a full `-T test` run. Parallelism and standing
    /// extra arguments come from the configuration; per-call extras go last.
    fn run_args(&self, build_configuration: &str, extra_args: &[String]) -> Vec<String> {
        let mut args = vec![
            format!("-j{}", self.config.jobs),
            "-C".to_string(),
            build_configuration.to_string(),
            "-T".to_string(),
            "test".to_string(),
            "--output-on-failure".to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.extend(extra_args.iter().cloned());
        args
    }

    fn set_state(&self, state: CoordinatorState) {
        *lock_recovering(&self.state) = state;
    }

    fn refresh_state_from_snapshot(&self) {
        let has_results = read_recovering(&self.snapshot).results.is_some();
        self.set_state(if has_results {
            CoordinatorState::ResultsAvailable
        } else {
            CoordinatorState::Ready
        });
    }
}

/// Base directory currently used for resolving relative failure paths.
impl RunCoordinator {
    pub fn decoration_base_dir(&self) -> PathBuf {
        read_recovering(&self.snapshot).index.base_dir().to_path_buf()
    }
}

fn parse_test_lines(stdout: &str) -> Vec<DiscoveredTest> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = TEST_LINE.captures(line.trim())?;
            let id = caps[1].parse().ok()?;
            Some(DiscoveredTest {
                id,
                name: caps[2].trim().to_string(),
            })
        })
        .collect()
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_recovering<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_recovering<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
