//! Engine configuration loaded from environment variables

use std::str::FromStr;

use tracing::warn;

/// Policy for accepted resubmissions of an already-solved problem.
///
/// Awarding points for every accepted submission rewards re-practice but
/// inflates the leaderboard; which one the platform wants is a product
/// decision, so it is an explicit switch rather than a hardcoded behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringPolicy {
    /// Every accepted submission awards points and bumps solved_count
    #[default]
    AlwaysAward,
    /// Only the first accepted submission per problem touches the ledger
    FirstSolveOnly,
}

impl FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always_award" => Ok(ScoringPolicy::AlwaysAward),
            "first_solve_only" => Ok(ScoringPolicy::FirstSolveOnly),
            other => Err(format!("unknown scoring policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address the HTTP API binds to
    pub bind_addr: String,
    /// Hard wall-clock limit per test-case execution (ms)
    pub time_limit_ms: u64,
    /// Cap on concurrently in-flight grading requests
    pub max_concurrent_gradings: usize,
    pub scoring_policy: ScoringPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            time_limit_ms: 5000,
            max_concurrent_gradings: 8,
            scoring_policy: ScoringPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| defaults.bind_addr.clone());

        let time_limit_ms = parse_env("TIME_LIMIT_MS", defaults.time_limit_ms);
        let max_concurrent_gradings =
            parse_env("MAX_CONCURRENT_GRADINGS", defaults.max_concurrent_gradings);
        let scoring_policy = parse_env("SCORING_POLICY", defaults.scoring_policy);

        Self {
            bind_addr,
            time_limit_ms,
            max_concurrent_gradings,
            scoring_policy,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring invalid {}={}: {}", name, raw, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_policy_from_str() {
        assert_eq!(
            "always_award".parse::<ScoringPolicy>().unwrap(),
            ScoringPolicy::AlwaysAward
        );
        assert_eq!(
            "first_solve_only".parse::<ScoringPolicy>().unwrap(),
            ScoringPolicy::FirstSolveOnly
        );
        assert!("sometimes".parse::<ScoringPolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.time_limit_ms, 5000);
        assert_eq!(config.max_concurrent_gradings, 8);
        assert_eq!(config.scoring_policy, ScoringPolicy::AlwaysAward);
    }
}
