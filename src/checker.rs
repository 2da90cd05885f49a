//! Output checking for graded test cases
//!
//! Comparison is strict string equality after trimming leading/trailing
//! whitespace of the whole string. No numeric tolerance, no per-line
//! normalization; changing this silently would change verdicts.

use crate::runner::{ExecutionOutcome, ExitKind};
use crate::verdict::TestResult;

/// Message attached to results that ran fine but printed the wrong output.
/// The submission's actual output is intentionally not echoed back.
pub const WRONG_OUTPUT_MESSAGE: &str = "wrong output";

/// Fold one execution outcome and its expected output into a test result
pub fn check(label: impl Into<String>, outcome: &ExecutionOutcome, expected: &str) -> TestResult {
    let label = label.into();

    if outcome.exit_kind != ExitKind::Completed {
        return TestResult {
            label,
            passed: false,
            message: outcome.diagnostic(),
        };
    }

    if compare_output(outcome.output(), expected) {
        TestResult {
            label,
            passed: true,
            message: String::new(),
        }
    } else {
        TestResult {
            label,
            passed: false,
            message: WRONG_OUTPUT_MESSAGE.to_string(),
        }
    }
}

/// Compare program output with expected output
pub fn compare_output(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(stdout: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_kind: ExitKind::Completed,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            runtime_ms: 5,
            memory_kb: 1024,
        }
    }

    #[test]
    fn test_compare_output_trims_whole_string() {
        assert!(compare_output("3\n", "3"));
        assert!(compare_output("  hello world \n", "hello world"));
        assert!(!compare_output("hello\nworld", "helloworld"));
    }

    #[test]
    fn test_compare_output_keeps_interior_whitespace() {
        assert!(!compare_output("a  b", "a b"));
    }

    #[test]
    fn test_matching_output_passes_with_empty_message() {
        let result = check("Test 1", &completed("3\n"), "3");
        assert!(result.passed);
        assert_eq!(result.message, "");
    }

    #[test]
    fn test_mismatch_reports_wrong_output_only() {
        let result = check("Test 1", &completed("4\n"), "3");
        assert!(!result.passed);
        assert_eq!(result.message, WRONG_OUTPUT_MESSAGE);
        // The actual output must not leak into the message
        assert!(!result.message.contains('4'));
    }

    #[test]
    fn test_timeout_outcome_fails_with_diagnostic() {
        let outcome = ExecutionOutcome {
            exit_kind: ExitKind::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            runtime_ms: 5000,
            memory_kb: 0,
        };
        let result = check("Test 2", &outcome, "3");
        assert!(!result.passed);
        assert_eq!(result.message, crate::runner::TIME_LIMIT_MESSAGE);
    }

    #[test]
    fn test_runtime_error_outcome_carries_stderr() {
        let outcome = ExecutionOutcome {
            exit_kind: ExitKind::RuntimeError,
            stdout: String::new(),
            stderr: "NameError: name 'x' is not defined\n".into(),
            exit_code: 1,
            runtime_ms: 8,
            memory_kb: 2048,
        };
        let result = check("Test 3", &outcome, "3");
        assert!(!result.passed);
        assert_eq!(result.message, "NameError: name 'x' is not defined");
    }

    #[test]
    fn test_check_is_deterministic() {
        let outcome = completed("42");
        let first = check("Test 1", &outcome, "42");
        let second = check("Test 1", &outcome, "42");
        assert_eq!(first, second);
    }
}
