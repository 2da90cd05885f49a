//! HTTP interface for the grading engine
//!
//! Two grading entry points ("run" against examples, "submit" against the
//! full suite) plus the leaderboard and a liveness probe. Admission is
//! bounded by a semaphore so a burst of submissions cannot fan out an
//! unbounded number of child processes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::{EngineConfig, ScoringPolicy};
use crate::error::EngineError;
use crate::grader;
use crate::languages::{self, DEFAULT_LANGUAGE};
use crate::runner::ProcessRunner;
use crate::store::{ProgressEntry, RedisStore};
use crate::verdict::{Status, TestResult, Verdict};

/// How many leaderboard rows the progress endpoint returns
const LEADERBOARD_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    store: RedisStore,
    config: Arc<EngineConfig>,
    /// Caps concurrently in-flight grading requests system-wide
    grading_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(store: RedisStore, config: EngineConfig) -> Self {
        let grading_permits = Arc::new(Semaphore::new(config.max_concurrent_gradings));
        Self {
            store,
            config: Arc::new(config),
            grading_permits,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run))
        .route("/submit", post(submit))
        .route("/progress", get(progress))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub problem_id: i64,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user: String,
    pub problem_id: i64,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerdictResponse {
    pub status: Status,
    pub runtime_ms: u64,
    pub memory_kb: u64,
    pub test_results: Vec<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerdictResponse {
    fn from_verdict(verdict: Verdict, message: Option<String>) -> Self {
        Self {
            status: verdict.status,
            runtime_ms: verdict.runtime_ms,
            memory_kb: verdict.memory_kb,
            test_results: verdict.test_results,
            message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("problem {0} not found")]
    ProblemNotFound(i64),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("too many grading requests in flight")]
    Busy,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ProblemNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn status_label(&self) -> &'static str {
        match self {
            ApiError::ProblemNotFound(_) => "not_found",
            ApiError::UnsupportedLanguage(_) => "bad_request",
            ApiError::Busy => "busy",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("Internal grading failure: {:#}", e);
        }

        let body = json!({
            "status": self.status_label(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Grade a submission against the problem's examples only. Nothing is
/// persisted and the progress ledger is untouched.
async fn run(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<VerdictResponse>, ApiError> {
    let _permit = state
        .grading_permits
        .clone()
        .try_acquire_owned()
        .map_err(|_| ApiError::Busy)?;

    let problem = state
        .store
        .load_problem(req.problem_id)
        .await?
        .ok_or(ApiError::ProblemNotFound(req.problem_id))?;
    let runner = resolve_runner(req.language.as_deref())?;

    let verdict = grader::grade(
        &runner,
        &req.code,
        problem.run_suite(),
        state.config.time_limit_ms,
        "Example",
    )
    .await?;

    Ok(Json(VerdictResponse::from_verdict(verdict, None)))
}

/// Grade a submission against hidden tests plus examples, persist it, and
/// on acceptance update the problem counters and the progress ledger.
async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<VerdictResponse>, ApiError> {
    let _permit = state
        .grading_permits
        .clone()
        .try_acquire_owned()
        .map_err(|_| ApiError::Busy)?;

    let problem = state
        .store
        .load_problem(req.problem_id)
        .await?
        .ok_or(ApiError::ProblemNotFound(req.problem_id))?;
    let runner = resolve_runner(req.language.as_deref())?;

    // Attempts count even when grading subsequently fails
    state.store.increment_attempts(req.problem_id).await?;

    let suite = problem.submit_suite();
    let verdict = grader::grade(
        &runner,
        &req.code,
        &suite,
        state.config.time_limit_ms,
        "Test",
    )
    .await?;

    let submission = state
        .store
        .append_submission(&req.user, req.problem_id, &req.code, &verdict)
        .await?;
    info!(
        "Stored submission {}: user={}, problem={}, status={}",
        submission.id, req.user, req.problem_id, verdict.status
    );

    let message = if verdict.is_accepted() {
        state.store.increment_solves(req.problem_id).await?;

        let award = match state.config.scoring_policy {
            ScoringPolicy::AlwaysAward => true,
            ScoringPolicy::FirstSolveOnly => {
                !state.store.is_solved(&req.user, req.problem_id).await?
            }
        };
        if award {
            let progress = state
                .store
                .apply_solve(&req.user, problem.difficulty, Utc::now().date_naive())
                .await?;
            info!(
                "Progress for {}: points={}, solved={}, streak={}",
                req.user, progress.points, progress.solved_count, progress.current_streak
            );
        }
        state.store.mark_solved(&req.user, req.problem_id).await?;

        String::new()
    } else {
        "Failed some tests".to_string()
    };

    Ok(Json(VerdictResponse::from_verdict(verdict, Some(message))))
}

/// Leaderboard: progress records ordered by points, descending
async fn progress(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProgressEntry>>, ApiError> {
    let entries = state.store.leaderboard(LEADERBOARD_LIMIT).await?;
    Ok(Json(entries))
}

async fn healthz() -> &'static str {
    "ok"
}

fn resolve_runner(language: Option<&str>) -> Result<ProcessRunner, ApiError> {
    let name = language.unwrap_or(DEFAULT_LANGUAGE);
    let config = languages::get_language_config(name)
        .ok_or_else(|| ApiError::UnsupportedLanguage(name.to_string()))?;
    Ok(ProcessRunner::new(&config))
}
