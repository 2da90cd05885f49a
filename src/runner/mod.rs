//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running submitted code:
//! - `ProcessRunner`: bare child-process execution in a single-use workspace
//!
//! The `Runner` trait is the portable isolation seam: a backend with
//! namespaces/cgroups/seccomp can replace `ProcessRunner` without touching
//! the grading pipeline.
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about problems, test suites, or scoring

pub mod process;

use async_trait::async_trait;

use crate::error::EngineError;

/// Message attached to test results whose execution hit the deadline
pub const TIME_LIMIT_MESSAGE: &str = "time limit exceeded";

/// How one execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited cleanly: zero status and nothing on stderr
    Completed,
    /// Forcibly terminated at the wall-clock deadline
    TimedOut,
    /// Exited non-zero or wrote diagnostics to stderr
    RuntimeError,
}

/// Raw result of running code against one test input
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub exit_kind: ExitKind,
    /// Captured stdout; on timeout, only what was buffered before the kill
    pub stdout: String,
    /// Captured stderr; on timeout, only what was buffered before the kill
    pub stderr: String,
    /// Exit code of the process (-1 when killed by the deadline or a signal)
    pub exit_code: i32,
    /// Elapsed wall-clock time (ms)
    pub runtime_ms: u64,
    /// Approximate peak resident memory (KB); 0 if the process exited
    /// before a sample landed
    pub memory_kb: u64,
}

impl ExecutionOutcome {
    /// Program output as compared against the expected output
    pub fn output(&self) -> &str {
        self.stdout.trim()
    }

    /// User-facing diagnostic for non-`Completed` outcomes
    pub fn diagnostic(&self) -> String {
        match self.exit_kind {
            ExitKind::Completed => String::new(),
            ExitKind::TimedOut => TIME_LIMIT_MESSAGE.to_string(),
            ExitKind::RuntimeError => {
                let stderr = self.stderr.trim();
                if stderr.is_empty() {
                    format!("process exited with code {}", self.exit_code)
                } else {
                    stderr.to_string()
                }
            }
        }
    }
}

/// Runner trait for executing untrusted submissions
///
/// Expected failure modes (timeout, crash, stderr output) are reported
/// inside `ExecutionOutcome`; an `Err` always means an environment failure
/// the caller must surface as an internal error.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run `code` once against `stdin` under a hard wall-clock limit
    async fn execute(
        &self,
        code: &str,
        stdin: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionOutcome, EngineError>;
}

// Re-exports
pub use process::ProcessRunner;

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_kind: ExitKind, stdout: &str, stderr: &str, exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_kind,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            runtime_ms: 1,
            memory_kb: 0,
        }
    }

    #[test]
    fn test_output_is_trimmed() {
        let o = outcome(ExitKind::Completed, "  3\n", "", 0);
        assert_eq!(o.output(), "3");
    }

    #[test]
    fn test_diagnostic_for_timeout() {
        let o = outcome(ExitKind::TimedOut, "", "", -1);
        assert_eq!(o.diagnostic(), TIME_LIMIT_MESSAGE);
    }

    #[test]
    fn test_diagnostic_is_stderr_for_runtime_error() {
        let o = outcome(ExitKind::RuntimeError, "", "Traceback: boom\n", 1);
        assert_eq!(o.diagnostic(), "Traceback: boom");
    }

    #[test]
    fn test_diagnostic_falls_back_to_exit_code() {
        let o = outcome(ExitKind::RuntimeError, "", "", 3);
        assert_eq!(o.diagnostic(), "process exited with code 3");
    }
}
