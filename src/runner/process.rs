//! Process runner implementation
//!
//! Executes a submission as a bare child process inside a single-use
//! temporary workspace, under a hard wall-clock deadline. The process runs
//! in its own process group so the deadline kill takes down anything the
//! submission forked.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{ExecutionOutcome, ExitKind, Runner};
use crate::error::EngineError;
use crate::languages::LanguageConfig;

/// Interval between peak-memory samples of the running process
const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Runner that executes code as a direct child process
pub struct ProcessRunner {
    /// Name of the file the submission is written to
    source_file: String,
    /// Command used to run it, relative to the workspace
    run_command: Vec<String>,
}

impl ProcessRunner {
    /// Create a runner for the given language
    pub fn new(language: &LanguageConfig) -> Self {
        Self {
            source_file: language.source_file.clone(),
            run_command: language.run_command.clone(),
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn execute(
        &self,
        code: &str,
        stdin: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionOutcome, EngineError> {
        let (program, args) = self
            .run_command
            .split_first()
            .ok_or(EngineError::EmptyCommand)?;

        // Single-use workspace; removed on every exit path below (either by
        // the explicit close or by TempDir's Drop).
        let workspace = tempfile::tempdir().map_err(EngineError::Workspace)?;
        tokio::fs::write(workspace.path().join(&self.source_file), code)
            .await
            .map_err(EngineError::Workspace)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(workspace.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(EngineError::Spawn)?;
        let started = Instant::now();
        let pid = child.id();

        // Feed stdin from a task so a submission that never reads its input
        // cannot stall us before the deadline is armed.
        if let Some(mut handle) = child.stdin.take() {
            let input = stdin.to_string();
            tokio::spawn(async move {
                let _ = handle.write_all(input.as_bytes()).await;
                let _ = handle.shutdown().await;
            });
        }

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stdout_task = child.stdout.take().map(|r| drain(r, stdout_buf.clone()));
        let stderr_task = child.stderr.take().map(|r| drain(r, stderr_buf.clone()));

        let peak_kb = Arc::new(AtomicU64::new(0));
        let sampler = pid.map(|p| spawn_memory_sampler(p, peak_kb.clone()));

        let waited = timeout(Duration::from_millis(time_limit_ms), child.wait()).await;

        let outcome = match waited {
            Ok(Ok(status)) => {
                let runtime_ms = started.elapsed().as_millis() as u64;

                // Streams hit EOF once the process is gone; let the drain
                // tasks finish flushing what remains in the pipes.
                if let Some(task) = stdout_task {
                    let _ = task.await;
                }
                if let Some(task) = stderr_task {
                    let _ = task.await;
                }

                let stdout = take_buffer(&stdout_buf);
                let stderr = take_buffer(&stderr_buf);
                let exit_code = status.code().unwrap_or(-1);
                let exit_kind = if !status.success() || !stderr.trim().is_empty() {
                    ExitKind::RuntimeError
                } else {
                    ExitKind::Completed
                };

                ExecutionOutcome {
                    exit_kind,
                    stdout,
                    stderr,
                    exit_code,
                    runtime_ms,
                    memory_kb: peak_kb.load(Ordering::Relaxed),
                }
            }
            Ok(Err(e)) => {
                kill_process_group(&mut child);
                let _ = child.wait().await;
                if let Some(task) = stdout_task {
                    task.abort();
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }
                if let Some(task) = sampler.as_ref() {
                    task.abort();
                }
                return Err(EngineError::Wait(e));
            }
            Err(_) => {
                debug!(
                    "Execution exceeded {}ms deadline; killing process group",
                    time_limit_ms
                );
                kill_process_group(&mut child);
                let _ = child.wait().await;

                // Do not wait for remaining output; keep what was buffered.
                if let Some(task) = stdout_task {
                    task.abort();
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }

                ExecutionOutcome {
                    exit_kind: ExitKind::TimedOut,
                    stdout: take_buffer(&stdout_buf),
                    stderr: take_buffer(&stderr_buf),
                    exit_code: -1,
                    runtime_ms: time_limit_ms,
                    memory_kb: peak_kb.load(Ordering::Relaxed),
                }
            }
        };

        if let Some(task) = sampler {
            task.abort();
        }
        if let Err(e) = workspace.close() {
            warn!("Failed to remove execution workspace: {}", e);
        }

        Ok(outcome)
    }
}

/// Copy a child stream into a shared buffer until EOF
fn drain<R>(mut reader: R, buf: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut guard) = buf.lock() {
                        guard.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    })
}

fn take_buffer(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    let bytes = buf
        .lock()
        .map(|mut guard| std::mem::take(&mut *guard))
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Sample the process's peak resident set (VmHWM) until it disappears
fn spawn_memory_sampler(pid: u32, peak_kb: Arc<AtomicU64>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let status_path = format!("/proc/{}/status", pid);
        loop {
            match tokio::fs::read_to_string(&status_path).await {
                Ok(status) => {
                    if let Some(kb) = parse_vm_hwm(&status) {
                        peak_kb.fetch_max(kb, Ordering::Relaxed);
                    }
                }
                // Process is gone; whatever we sampled is the answer
                Err(_) => break,
            }
            sleep(MEMORY_SAMPLE_INTERVAL).await;
        }
    })
}

/// Parse the VmHWM line (peak resident set, in KB) out of /proc/<pid>/status
fn parse_vm_hwm(status: &str) -> Option<u64> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            return rest.trim().trim_end_matches("kB").trim().parse().ok();
        }
    }
    None
}

/// SIGKILL the whole process group rooted at the child
fn kill_process_group(child: &mut Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = signal::killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
    // If the group kill raced the child's own exit, make sure the direct
    // child is dead anyway
    let _ = child.start_kill();
}
