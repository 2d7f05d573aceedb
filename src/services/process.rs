//! Process execution collaborator.
//!
//! The coordinator never talks to `tokio::process` directly; it goes
//! through the [`ProcessRunner`] trait so tests can script runner behavior.
//! The default implementation streams child stdout/stderr line-by-line to
//! an optional [`OutputConsumer`] while accumulating the full output.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{IngestError, IngestResult};

/// Receives streamed per-line callbacks for stdout and stderr separately.
pub trait OutputConsumer: Send + Sync {
    fn output(&self, line: &str);
    fn error(&self, line: &str);
}

/// Pass-through consumer that logs every runner line.
pub struct LoggingOutputConsumer;

impl OutputConsumer for LoggingOutputConsumer {
    fn output(&self, line: &str) {
        info!("{}", line);
    }

    fn error(&self, line: &str) {
        self.output(line);
    }
}

/// Cooperative cancellation handle shared between a coordinator and a run.
///
/// Cancellation is level-triggered: once set, every current and future
/// waiter observes it until `reset` is called for the next run.
#[derive(Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all waiters.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Clear the flag before starting a new run.
    pub fn reset(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check after arming the waiter so a cancel between the
            // check and the await is not lost.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Options for one process invocation.
#[derive(Clone, Default)]
pub struct ExecOptions {
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Additional environment variables
    pub env: Vec<(String, String)>,
    /// Cancellation handle; when triggered the child is killed best-effort
    pub cancel: Option<CancelFlag>,
}

/// Result of a completed process invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Accumulated stdout
    pub stdout: String,
    /// Accumulated stderr
    pub stderr: String,
}

/// Subprocess execution seam.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Launch a process, stream its output, and await its exit.
    ///
    /// Returns [`IngestError::ProcessLaunch`] when the binary cannot be
    /// started and [`IngestError::Cancelled`] when the options' cancel
    /// flag fires before the process exits. Timeout policy is the caller's
    /// responsibility, not this trait's.
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: ExecOptions,
        consumer: Option<Arc<dyn OutputConsumer>>,
    ) -> IngestResult<ProcessOutput>;
}

/// Default [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: ExecOptions,
        consumer: Option<Arc<dyn OutputConsumer>>,
    ) -> IngestResult<ProcessOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &options.env {
            command.env(key, value);
        }

        debug!("Executing {} {:?}", program, args);
        let mut child = command.spawn().map_err(|source| IngestError::ProcessLaunch {
            program: program.to_string(),
            source,
        })?;

        let stdout_task = stream_lines(child.stdout.take(), consumer.clone(), false);
        let stderr_task = stream_lines(child.stderr.take(), consumer, true);

        let cancel = options.cancel.unwrap_or_default();
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                warn!("Cancellation requested, terminating {}", program);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill child process: {}", e);
                }
                return Err(IngestError::Cancelled);
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Read a child pipe to completion, forwarding each line to the consumer.
fn stream_lines<R>(
    pipe: Option<R>,
    consumer: Option<Arc<dyn OutputConsumer>>,
    is_stderr: bool,
) -> tokio::task::JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(pipe) = pipe else {
            return String::new();
        };
        let mut lines = BufReader::new(pipe).lines();
        let mut collected = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(consumer) = &consumer {
                if is_stderr {
                    consumer.error(&line);
                } else {
                    consumer.output(&line);
                }
            }
            collected.push_str(&line);
            collected.push('\n');
        }
        collected
    })
}
