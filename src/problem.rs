//! Problem catalog contract
//!
//! The problem catalog is an external collaborator: it authors problems and
//! writes them to the store; the engine only reads them. These are the
//! shapes the catalog must supply per problem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One test case: an input fed to the submission and the output it must
/// produce. Immutable, owned by the problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// Problem difficulty used for point mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// Anything the catalog sends that we do not recognize
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Problem definition as supplied by the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSpec {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub difficulty: Difficulty,
    /// Test cases visible to the user, used for "run" requests
    pub examples: Vec<TestCase>,
    /// Test cases withheld from the user, used only during "submit" grading
    pub hidden_tests: Vec<TestCase>,
}

impl ProblemSpec {
    /// Suite for a "run" request: examples only
    pub fn run_suite(&self) -> &[TestCase] {
        &self.examples
    }

    /// Suite for a "submit" request: hidden tests first, then examples, so
    /// example failures surface under the same comparison as in run mode
    pub fn submit_suite(&self) -> Vec<TestCase> {
        let mut suite = Vec::with_capacity(self.hidden_tests.len() + self.examples.len());
        suite.extend(self.hidden_tests.iter().cloned());
        suite.extend(self.examples.iter().cloned());
        suite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(input: &str, output: &str) -> TestCase {
        TestCase {
            input: input.into(),
            expected_output: output.into(),
        }
    }

    #[test]
    fn test_submit_suite_is_hidden_first() {
        let problem = ProblemSpec {
            id: 1,
            title: "Sum of Two Numbers".into(),
            difficulty: Difficulty::Easy,
            examples: vec![case("1\n2", "3")],
            hidden_tests: vec![case("3\n4", "7"), case("10\n20", "30")],
        };

        let suite = problem.submit_suite();
        assert_eq!(suite.len(), 3);
        assert_eq!(suite[0].input, "3\n4");
        assert_eq!(suite[1].input, "10\n20");
        assert_eq!(suite[2].input, "1\n2");
    }

    #[test]
    fn test_difficulty_unknown_catch_all() {
        let parsed: Difficulty = serde_json::from_str("\"expert\"").unwrap();
        assert_eq!(parsed, Difficulty::Unknown);
        let parsed: Difficulty = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Difficulty::Medium);
    }

    #[test]
    fn test_problem_spec_deserializes_catalog_payload() {
        let payload = r#"{
            "id": 7,
            "difficulty": "hard",
            "examples": [{"input": "5", "expected_output": "5"}],
            "hidden_tests": [{"input": "10", "expected_output": "55"}]
        }"#;
        let problem: ProblemSpec = serde_json::from_str(payload).unwrap();
        assert_eq!(problem.id, 7);
        assert_eq!(problem.title, "");
        assert_eq!(problem.difficulty, Difficulty::Hard);
        assert_eq!(problem.run_suite().len(), 1);
    }
}
