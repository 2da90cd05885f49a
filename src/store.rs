//! Redis store - persistence for the grading engine
//!
//! This module owns all Redis operations:
//! - Problem catalog reads and attempt/solve counters
//! - Append-only submission records
//! - Progress ledger persistence, serialized per user with a lock lease
//! - Leaderboard sorted set

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::ledger::{self, ProgressRecord};
use crate::problem::{Difficulty, ProblemSpec};
use crate::verdict::Verdict;

/// Redis key constants
pub mod keys {
    /// Problem definition written by the catalog collaborator
    pub const PROBLEM_PREFIX: &str = "problem:";

    /// Per-problem attempts/solves hash
    pub const PROBLEM_STATS_SUFFIX: &str = ":stats";

    /// Sequence for submission IDs
    pub const SUBMISSION_SEQ: &str = "submissions:seq";

    /// Immutable submission record
    pub const SUBMISSION_PREFIX: &str = "submission:";

    /// Per-user submission index
    pub const USER_SUBMISSIONS_SUFFIX: &str = ":submissions";

    /// Per-user progress record
    pub const PROGRESS_PREFIX: &str = "progress:";

    /// Per-user progress update lock lease
    pub const PROGRESS_LOCK_PREFIX: &str = "progress:lock:";

    /// Per-user set of solved problem IDs
    pub const SOLVED_SUFFIX: &str = ":solved";

    /// Sorted set of users by points
    pub const LEADERBOARD: &str = "leaderboard:points";

    pub const USER_PREFIX: &str = "user:";
}

/// TTL of the per-user progress lock lease; bounds how long a crashed
/// update can block other submissions by the same user
const PROGRESS_LOCK_TTL_SECS: u64 = 10;
const PROGRESS_LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);
const PROGRESS_LOCK_MAX_ATTEMPTS: u32 = 200;

/// Persisted fact about one submit request; written once, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub user: String,
    pub problem_id: i64,
    pub code: String,
    pub verdict: Verdict,
    pub created_at: DateTime<Utc>,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEntry {
    pub user: String,
    #[serde(flatten)]
    pub record: ProgressRecord,
}

/// Store for all grading-engine persistence
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a store using the REDIS_URL environment variable.
    /// Defaults to "redis://localhost:6379" if not set.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        Self::with_url(&url).await
    }

    async fn with_url(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
        let conn = get_connection_with_retry(&client).await;
        info!("Connected to Redis at {}", redis_url);
        Ok(Self { conn })
    }

    /// Load a problem definition written by the catalog
    pub async fn load_problem(&self, problem_id: i64) -> Result<Option<ProblemSpec>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(problem_key(problem_id)).await?;
        match raw {
            Some(json) => {
                let problem = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt problem record for {}", problem_id))?;
                Ok(Some(problem))
            }
            None => Ok(None),
        }
    }

    /// Atomically bump a problem's attempt counter
    pub async fn increment_attempts(&self, problem_id: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .hincr(problem_stats_key(problem_id), "attempts", 1i64)
            .await?;
        Ok(())
    }

    /// Atomically bump a problem's solve counter
    pub async fn increment_solves(&self, problem_id: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .hincr(problem_stats_key(problem_id), "solves", 1i64)
            .await?;
        Ok(())
    }

    /// Persist a submission as a new immutable record and return it
    pub async fn append_submission(
        &self,
        user: &str,
        problem_id: i64,
        code: &str,
        verdict: &Verdict,
    ) -> Result<SubmissionRecord> {
        let mut conn = self.conn.clone();

        let id: i64 = conn.incr(keys::SUBMISSION_SEQ, 1i64).await?;
        let record = SubmissionRecord {
            id,
            user: user.to_string(),
            problem_id,
            code: code.to_string(),
            verdict: verdict.clone(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&record)?;
        conn.set::<_, _, ()>(submission_key(id), json).await?;
        let _: i64 = conn.rpush(user_submissions_key(user), id).await?;

        Ok(record)
    }

    /// Whether the user has an accepted submission for this problem
    pub async fn is_solved(&self, user: &str, problem_id: i64) -> Result<bool> {
        let mut conn = self.conn.clone();
        let solved: bool = conn.sismember(solved_key(user), problem_id).await?;
        Ok(solved)
    }

    /// Remember that the user has solved this problem
    pub async fn mark_solved(&self, user: &str, problem_id: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.sadd(solved_key(user), problem_id).await?;
        Ok(())
    }

    /// Load a user's progress record
    pub async fn load_progress(&self, user: &str) -> Result<Option<ProgressRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(progress_key(user)).await?;
        match raw {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt progress record for {}", user))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Apply one accepted solve to the user's progress record.
    ///
    /// The read-modify-write runs under a per-user lock lease so concurrent
    /// submissions by the same user cannot lose updates, across workers.
    pub async fn apply_solve(
        &self,
        user: &str,
        difficulty: Difficulty,
        solve_date: NaiveDate,
    ) -> Result<ProgressRecord> {
        self.acquire_progress_lock(user).await?;
        let result = self.apply_solve_locked(user, difficulty, solve_date).await;
        self.release_progress_lock(user).await;
        result
    }

    async fn apply_solve_locked(
        &self,
        user: &str,
        difficulty: Difficulty,
        solve_date: NaiveDate,
    ) -> Result<ProgressRecord> {
        let mut conn = self.conn.clone();

        let mut record = self.load_progress(user).await?.unwrap_or_default();
        ledger::record_solve(&mut record, difficulty, solve_date);

        let json = serde_json::to_string(&record)?;
        conn.set::<_, _, ()>(progress_key(user), json).await?;
        let _: i64 = conn
            .zadd(keys::LEADERBOARD, user, record.points)
            .await?;

        Ok(record)
    }

    /// Top progress records ordered by points, descending
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<ProgressEntry>> {
        let mut conn = self.conn.clone();
        let users: Vec<String> = conn
            .zrevrange(keys::LEADERBOARD, 0, limit as isize - 1)
            .await?;

        let mut entries = Vec::with_capacity(users.len());
        for user in users {
            if let Some(record) = self.load_progress(&user).await? {
                entries.push(ProgressEntry { user, record });
            }
        }
        Ok(entries)
    }

    /// Claim the per-user progress lock lease (SET NX with expiry)
    async fn acquire_progress_lock(&self, user: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = progress_lock_key(user);

        for _ in 0..PROGRESS_LOCK_MAX_ATTEMPTS {
            let claimed: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg("locked")
                .arg("NX")
                .arg("EX")
                .arg(PROGRESS_LOCK_TTL_SECS as usize)
                .query_async(&mut conn)
                .await?;

            if claimed.is_some() {
                return Ok(());
            }

            sleep(PROGRESS_LOCK_RETRY_DELAY).await;
        }

        anyhow::bail!("Timed out waiting for progress lock of user {}", user)
    }

    async fn release_progress_lock(&self, user: &str) {
        let mut conn = self.conn.clone();
        // Best effort: the lease expires on its own if this fails
        if let Err(e) = conn.del::<_, i64>(progress_lock_key(user)).await {
            warn!("Failed to release progress lock for {}: {}", user, e);
        }
    }
}

fn problem_key(problem_id: i64) -> String {
    format!("{}{}", keys::PROBLEM_PREFIX, problem_id)
}

fn problem_stats_key(problem_id: i64) -> String {
    format!(
        "{}{}{}",
        keys::PROBLEM_PREFIX,
        problem_id,
        keys::PROBLEM_STATS_SUFFIX
    )
}

fn submission_key(id: i64) -> String {
    format!("{}{}", keys::SUBMISSION_PREFIX, id)
}

fn user_submissions_key(user: &str) -> String {
    format!(
        "{}{}{}",
        keys::USER_PREFIX,
        user,
        keys::USER_SUBMISSIONS_SUFFIX
    )
}

fn progress_key(user: &str) -> String {
    format!("{}{}", keys::PROGRESS_PREFIX, user)
}

fn progress_lock_key(user: &str) -> String {
    format!("{}{}", keys::PROGRESS_LOCK_PREFIX, user)
}

fn solved_key(user: &str) -> String {
    format!("{}{}{}", keys::USER_PREFIX, user, keys::SOLVED_SUFFIX)
}

/// Get a Redis connection manager with retry logic
async fn get_connection_with_retry(client: &redis::Client) -> ConnectionManager {
    loop {
        match client.get_connection_manager().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in 3 seconds...",
                    e
                );
                sleep(Duration::from_secs(3)).await;
            }
        }
    }
}
