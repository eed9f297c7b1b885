use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::db::models::Quiz;
use crate::repositories;
use crate::services::{attempts, effective_settings};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub attempts_processed: u64,
    pub quizzes_touched: u64,
    pub failures: u64,
}

/// One sweep pass: every unfinished attempt whose check time has come is run
/// through the same expiry transition live requests use. Each attempt commits
/// on its own, so a failure is isolated and a re-run skips rows that already
/// moved on via the check-time predicate.
pub async fn sweep(state: &AppState, now: i64, process_up_to: i64) -> Result<SweepStats> {
    let due = repositories::attempts::list_due(
        state.db(),
        process_up_to,
        state.settings().sweeper().batch_limit,
    )
    .await
    .context("Failed to list due attempts")?;

    let mut stats = SweepStats::default();
    let mut quiz_cache: HashMap<String, Quiz> = HashMap::new();
    let mut touched: HashSet<String> = HashSet::new();

    for attempt in due {
        if !quiz_cache.contains_key(&attempt.quiz_id) {
            match repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id).await {
                Ok(Some(quiz)) => {
                    quiz_cache.insert(attempt.quiz_id.clone(), quiz);
                }
                Ok(None) => {
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        quiz_id = %attempt.quiz_id,
                        "Skipping attempt whose quiz no longer exists"
                    );
                    stats.failures += 1;
                    continue;
                }
                Err(err) => {
                    tracing::error!(
                        attempt_id = %attempt.id,
                        quiz_id = %attempt.quiz_id,
                        error = %err,
                        "Failed to load quiz for due attempt"
                    );
                    stats.failures += 1;
                    continue;
                }
            }
        }
        let quiz = quiz_cache[&attempt.quiz_id].clone();

        let settings = match effective_settings::resolve(state.db(), &quiz, &attempt.user_id).await
        {
            Ok(settings) => settings,
            Err(err) => {
                tracing::error!(
                    attempt_id = %attempt.id,
                    quiz_id = %quiz.id,
                    error = %err,
                    "Failed to resolve overrides for due attempt"
                );
                stats.failures += 1;
                continue;
            }
        };

        match attempts::handle_time_expiry_with(state, &attempt.id, &quiz, &settings, now).await {
            Ok(_) => {
                stats.attempts_processed += 1;
                touched.insert(quiz.id.clone());
            }
            Err(err) => {
                tracing::error!(
                    attempt_id = %attempt.id,
                    quiz_id = %quiz.id,
                    error = %err,
                    "Failed to process overdue attempt"
                );
                stats.failures += 1;
            }
        }
    }

    stats.quizzes_touched = touched.len() as u64;

    tracing::info!(
        attempts_processed = stats.attempts_processed,
        quizzes_touched = stats.quizzes_touched,
        failures = stats.failures,
        "Swept overdue attempts"
    );
    metrics::counter!("attempts_swept_total").increment(stats.attempts_processed);
    metrics::counter!("attempt_sweep_failures_total").increment(stats.failures);

    Ok(stats)
}
