//! Verdict types shared across the grading pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate status of a grading run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    InternalError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Accepted => "accepted",
            Status::WrongAnswer => "wrong_answer",
            Status::RuntimeError => "runtime_error",
            Status::TimeLimitExceeded => "time_limit_exceeded",
            Status::InternalError => "internal_error",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a single test case, kept in the verdict for user-facing detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub label: String,
    pub passed: bool,
    pub message: String,
}

/// Aggregate result of grading one submission against a test suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    /// Maximum wall-clock time observed across test cases (ms)
    pub runtime_ms: u64,
    /// Maximum peak resident memory observed across test cases (KB)
    pub memory_kb: u64,
    /// Per-test results, in input test-case order
    pub test_results: Vec<TestResult>,
    /// Diagnostic for internal errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.status == Status::Accepted
    }
}
