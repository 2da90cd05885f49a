//! Engine error taxonomy
//!
//! `EngineError` covers environment-level failures only: anything the
//! grading pipeline cannot attribute to the submitted code. Expected
//! failure modes (timeout, crash, wrong output) are carried inside
//! `ExecutionOutcome` / `Verdict` and never surface as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The single-use execution workspace could not be created or written.
    #[error("failed to set up execution workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// The submission process could not be spawned at all.
    #[error("failed to spawn submission process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Waiting on the submission process failed.
    #[error("failed to wait for submission process: {0}")]
    Wait(#[source] std::io::Error),

    /// The configured run command for the language is empty.
    #[error("language run command is empty")]
    EmptyCommand,

    /// Grading was requested with no test cases at all.
    #[error("no test cases to grade")]
    NoTestCases,
}
