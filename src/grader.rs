//! Grading orchestrator
//!
//! Runs a submission against an ordered test suite and aggregates the
//! per-test results into a single verdict. Every test case is attempted so
//! the caller always gets a complete per-test report; the one exception is
//! an environment failure, which aborts the run immediately.

use tracing::info;

use crate::checker;
use crate::error::EngineError;
use crate::problem::TestCase;
use crate::runner::{ExitKind, Runner};
use crate::verdict::{Status, TestResult, Verdict};

/// Grade `code` against `tests`, in order, without short-circuiting.
///
/// The overall status is `Accepted` only if every test passed. Otherwise a
/// runner-reported failure (`TimedOut`/`RuntimeError`) takes precedence over
/// `WrongAnswer`, with the first such failing test by input order as the
/// representative cause.
///
/// An `Err` means an environment failure; no partial results are returned
/// in that case since the failure cannot be attributed to the submission.
pub async fn grade(
    runner: &dyn Runner,
    code: &str,
    tests: &[TestCase],
    time_limit_ms: u64,
    label_prefix: &str,
) -> Result<Verdict, EngineError> {
    if tests.is_empty() {
        return Err(EngineError::NoTestCases);
    }

    let mut test_results: Vec<TestResult> = Vec::with_capacity(tests.len());
    let mut first_runner_failure: Option<Status> = None;
    let mut any_wrong = false;
    let mut max_runtime_ms = 0u64;
    let mut max_memory_kb = 0u64;

    for (idx, test) in tests.iter().enumerate() {
        let outcome = runner.execute(code, &test.input, time_limit_ms).await?;

        max_runtime_ms = max_runtime_ms.max(outcome.runtime_ms);
        max_memory_kb = max_memory_kb.max(outcome.memory_kb);

        let label = format!("{} {}", label_prefix, idx + 1);
        let result = checker::check(label, &outcome, &test.expected_output);

        match outcome.exit_kind {
            ExitKind::TimedOut => {
                first_runner_failure.get_or_insert(Status::TimeLimitExceeded);
            }
            ExitKind::RuntimeError => {
                first_runner_failure.get_or_insert(Status::RuntimeError);
            }
            ExitKind::Completed => {
                if !result.passed {
                    any_wrong = true;
                }
            }
        }

        test_results.push(result);
    }

    let status = match first_runner_failure {
        Some(cause) => cause,
        None if any_wrong => Status::WrongAnswer,
        None => Status::Accepted,
    };

    // Keep the first failing test's diagnostic on the verdict itself so a
    // persisted record is meaningful without replaying the test results
    let error_message = test_results
        .iter()
        .find(|r| !r.passed)
        .map(|r| r.message.clone());

    info!(
        "Grading summary: status={}, tests={}, max_runtime_ms={}, max_memory_kb={}",
        status,
        test_results.len(),
        max_runtime_ms,
        max_memory_kb
    );

    Ok(Verdict {
        status,
        runtime_ms: max_runtime_ms,
        memory_kb: max_memory_kb,
        test_results,
        error_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ExecutionOutcome;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    /// Runner that replays a scripted sequence of outcomes
    struct ScriptedRunner {
        outcomes: Mutex<VecDeque<Result<ExecutionOutcome, EngineError>>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<ExecutionOutcome, EngineError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl Runner for ScriptedRunner {
        async fn execute(
            &self,
            _code: &str,
            _stdin: &str,
            _time_limit_ms: u64,
        ) -> Result<ExecutionOutcome, EngineError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted runner ran out of outcomes")
        }
    }

    fn completed(stdout: &str, runtime_ms: u64, memory_kb: u64) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_kind: ExitKind::Completed,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            runtime_ms,
            memory_kb,
        }
    }

    fn timed_out() -> ExecutionOutcome {
        ExecutionOutcome {
            exit_kind: ExitKind::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            runtime_ms: 5000,
            memory_kb: 0,
        }
    }

    fn runtime_error(stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_kind: ExitKind::RuntimeError,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
            runtime_ms: 10,
            memory_kb: 512,
        }
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.into(),
            expected_output: expected.into(),
        }
    }

    #[tokio::test]
    async fn test_all_passing_is_accepted() {
        let runner = ScriptedRunner::new(vec![
            Ok(completed("3\n", 10, 1000)),
            Ok(completed("7\n", 20, 800)),
        ]);
        let tests = vec![case("1\n2", "3"), case("3\n4", "7")];

        let verdict = grade(&runner, "code", &tests, 5000, "Test").await.unwrap();

        assert_eq!(verdict.status, Status::Accepted);
        assert_eq!(verdict.test_results.len(), 2);
        assert!(verdict.test_results.iter().all(|r| r.passed));
        assert!(verdict.error_message.is_none());
    }

    #[tokio::test]
    async fn test_one_wrong_answer_fails_whole_run() {
        let runner = ScriptedRunner::new(vec![
            Ok(completed("3\n", 10, 1000)),
            Ok(completed("8\n", 20, 800)),
        ]);
        let tests = vec![case("1\n2", "3"), case("3\n4", "7")];

        let verdict = grade(&runner, "code", &tests, 5000, "Example").await.unwrap();

        assert_eq!(verdict.status, Status::WrongAnswer);
        assert_eq!(verdict.test_results.len(), 2);
        assert!(verdict.test_results[0].passed);
        assert!(!verdict.test_results[1].passed);
        assert_eq!(verdict.test_results[1].label, "Example 2");
    }

    #[tokio::test]
    async fn test_no_short_circuit_on_failure() {
        let runner = ScriptedRunner::new(vec![
            Ok(completed("wrong\n", 1, 1)),
            Ok(completed("3\n", 1, 1)),
            Ok(completed("7\n", 1, 1)),
        ]);
        let tests = vec![case("a", "right"), case("1\n2", "3"), case("3\n4", "7")];

        let verdict = grade(&runner, "code", &tests, 5000, "Test").await.unwrap();

        // Every test was attempted despite the first failing
        assert_eq!(verdict.test_results.len(), 3);
        assert!(verdict.test_results[1].passed);
        assert!(verdict.test_results[2].passed);
    }

    #[tokio::test]
    async fn test_runner_failure_takes_precedence_over_wrong_answer() {
        // Wrong answer on the first test, timeout on the second: the
        // timeout is the representative cause
        let runner = ScriptedRunner::new(vec![
            Ok(completed("wrong\n", 1, 1)),
            Ok(timed_out()),
            Ok(runtime_error("boom")),
        ]);
        let tests = vec![case("a", "b"), case("c", "d"), case("e", "f")];

        let verdict = grade(&runner, "code", &tests, 5000, "Test").await.unwrap();

        assert_eq!(verdict.status, Status::TimeLimitExceeded);
    }

    #[tokio::test]
    async fn test_first_runner_failure_wins() {
        let runner = ScriptedRunner::new(vec![
            Ok(runtime_error("NameError")),
            Ok(timed_out()),
        ]);
        let tests = vec![case("a", "b"), case("c", "d")];

        let verdict = grade(&runner, "code", &tests, 5000, "Test").await.unwrap();

        assert_eq!(verdict.status, Status::RuntimeError);
        assert_eq!(verdict.test_results[0].message, "NameError");
        assert_eq!(verdict.error_message.as_deref(), Some("NameError"));
    }

    #[tokio::test]
    async fn test_resource_usage_is_maximum_across_tests() {
        let runner = ScriptedRunner::new(vec![
            Ok(completed("3\n", 120, 4096)),
            Ok(completed("7\n", 80, 9000)),
        ]);
        let tests = vec![case("1\n2", "3"), case("3\n4", "7")];

        let verdict = grade(&runner, "code", &tests, 5000, "Test").await.unwrap();

        assert_eq!(verdict.runtime_ms, 120);
        assert_eq!(verdict.memory_kb, 9000);
    }

    #[tokio::test]
    async fn test_environment_failure_aborts_grading() {
        let runner = ScriptedRunner::new(vec![
            Ok(completed("3\n", 1, 1)),
            Err(EngineError::Spawn(io::Error::new(
                io::ErrorKind::NotFound,
                "python3 missing",
            ))),
        ]);
        let tests = vec![case("1\n2", "3"), case("3\n4", "7")];

        let result = grade(&runner, "code", &tests, 5000, "Test").await;

        assert!(matches!(result, Err(EngineError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_empty_suite_is_refused() {
        let runner = ScriptedRunner::new(vec![]);

        let result = grade(&runner, "code", &[], 5000, "Test").await;

        assert!(matches!(result, Err(EngineError::NoTestCases)));
    }
}
