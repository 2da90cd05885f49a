//! Progress ledger
//!
//! Pure points/streak bookkeeping for accepted submissions. Persistence and
//! per-user serialization live in the store; this module only encodes the
//! state machine so it can be tested without I/O.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::problem::Difficulty;

/// Per-user cumulative progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub points: u64,
    pub solved_count: u64,
    pub current_streak: u64,
    pub last_solve_date: Option<NaiveDate>,
}

/// Points awarded per accepted solve
pub fn points_for(difficulty: Difficulty) -> u64 {
    match difficulty {
        Difficulty::Easy => 10,
        Difficulty::Medium => 20,
        Difficulty::Hard => 30,
        Difficulty::Unknown => 0,
    }
}

/// Apply one accepted solve to a progress record.
///
/// Streak rules, against the previous `last_solve_date`:
/// - no prior solve: streak starts at 1
/// - solve on the next calendar day: streak grows by 1
/// - solve after a gap: streak restarts at 1
/// - second solve on the same day: streak unchanged
/// - solve date before the last one (clock skew): streak unchanged
///
/// Points and solved_count grow on every call; whether repeat solves of the
/// same problem reach this function at all is the caller's scoring policy.
pub fn record_solve(record: &mut ProgressRecord, difficulty: Difficulty, solve_date: NaiveDate) {
    record.points += points_for(difficulty);
    record.solved_count += 1;

    match record.last_solve_date {
        None => {
            record.current_streak = 1;
        }
        Some(last) => {
            let next_day = last + Duration::days(1);
            if solve_date == next_day {
                record.current_streak += 1;
            } else if solve_date > next_day {
                record.current_streak = 1;
            }
            // same day or earlier: leave the streak alone
        }
    }

    record.last_solve_date = Some(solve_date);
}
