use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use uuid::Uuid;

use crate::access::rule::RuleContext;
use crate::access::AccessManager;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Attempt, Quiz};
use crate::db::types::{AttemptState, NavigationMethod, OverdueHandling};
use crate::repositories;
use crate::services::capabilities::CAP_IGNORE_TIME_LIMITS;
use crate::services::effective_settings::{self, EffectiveSettings};
use crate::services::grading::{self, GRADE_EPSILON};
use crate::services::layout;
use crate::services::notifications::{
    self, TEMPLATE_SUBMISSION_CONFIRMATION, TEMPLATE_SUBMISSION_NOTICE,
};
use crate::services::question_engine::VariantStrategy;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("quiz has a maximum grade but no questions that can contribute marks")]
    MisconfiguredQuiz,
    #[error("no questions available for slot {slot} (category {category})")]
    NotEnoughQuestions { slot: i32, category: String },
    #[error("attempt {0} was updated concurrently")]
    Conflict(String),
    #[error("attempt {0} not found")]
    NotFound(String),
    #[error("attempt {0} is no longer in progress")]
    NotInProgress(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error("question engine failure: {0}")]
    Engine(#[source] anyhow::Error),
}

/// What a time-expiry check decided to do with an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    None,
    MarkOverdue { until: i64 },
    Finish,
    Abandon,
}

/// The deadline this attempt is running against: the quiz close time or the
/// started-at-plus-limit cutoff, whichever comes first. `None` when neither
/// bound applies.
pub fn deadline_from(settings: &EffectiveSettings, time_start: i64) -> Option<i64> {
    let close = (settings.time_close > 0).then_some(settings.time_close);
    let limit = (settings.time_limit > 0).then_some(time_start + settings.time_limit);
    match (close, limit) {
        (Some(close), Some(limit)) => Some(close.min(limit)),
        (bound, None) | (None, bound) => bound,
    }
}

pub fn effective_deadline(settings: &EffectiveSettings, attempt: &Attempt) -> Option<i64> {
    deadline_from(settings, attempt.time_start)
}

/// Decides the expiry transition. Idempotent: re-running with the same `now`
/// against the resulting state yields `None`, and terminal states are never
/// touched. A single call may cross both the deadline and the grace boundary,
/// going straight from IN_PROGRESS to finished.
pub fn expiry_action(
    policy: OverdueHandling,
    state: AttemptState,
    deadline: Option<i64>,
    grace: i64,
    now: i64,
) -> ExpiryAction {
    if state.is_terminal() {
        return ExpiryAction::None;
    }
    let Some(deadline) = deadline else {
        return ExpiryAction::None;
    };
    // A deadline extension granted mid-flight (override added while the
    // attempt is already overdue) simply pushes the boundary out again.
    if now < deadline {
        return ExpiryAction::None;
    }

    match policy {
        OverdueHandling::Autosubmit => ExpiryAction::Finish,
        OverdueHandling::Autoabandon => ExpiryAction::Abandon,
        OverdueHandling::Graceperiod => {
            if now >= deadline + grace {
                ExpiryAction::Finish
            } else if state == AttemptState::Inprogress {
                ExpiryAction::MarkOverdue { until: deadline + grace }
            } else {
                ExpiryAction::None
            }
        }
    }
}

/// The next instant at which this attempt must be re-examined, or `None`
/// when it never needs to be.
pub fn next_check_time(
    policy: OverdueHandling,
    state: AttemptState,
    deadline: Option<i64>,
    grace: i64,
) -> Option<i64> {
    match state {
        AttemptState::Inprogress => deadline,
        AttemptState::Overdue => match policy {
            OverdueHandling::Graceperiod => deadline.map(|value| value + grace),
            _ => deadline,
        },
        AttemptState::Finished | AttemptState::Abandoned => None,
    }
}

/// Outcome of a page-navigation request. `Redirect` means the requested page
/// was not directly usable and the caller must re-render at the given page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Show(i32),
    Redirect(i32),
}

pub fn resolve_page_request(
    current: i32,
    requested: i32,
    last: i32,
    navigation: NavigationMethod,
) -> PageRequest {
    let clamped = requested.clamp(0, last);
    if navigation == NavigationMethod::Sequential && clamped < current {
        return PageRequest::Redirect(current);
    }
    if clamped != requested {
        return PageRequest::Redirect(clamped);
    }
    PageRequest::Show(clamped)
}

/// Everything the web layer needs to gate a user's next action on a quiz:
/// the assembled rule chain, the resolved settings, and the attempt history
/// the rules judge against.
pub struct QuizAccess {
    pub manager: AccessManager,
    pub settings: EffectiveSettings,
    pub num_prior_attempts: i64,
    pub last_attempt: Option<Attempt>,
}

pub async fn access_for(
    state: &AppState,
    quiz: &Quiz,
    user_id: &str,
    now: i64,
    remote_addr: Option<IpAddr>,
) -> Result<QuizAccess, AttemptError> {
    let settings = effective_settings::resolve(state.db(), quiz, user_id).await?;
    let ignore_time_limits = state
        .capabilities()
        .has_capability(CAP_IGNORE_TIME_LIMITS, &quiz.course_id, user_id)
        .await;

    let manager = AccessManager::new(&RuleContext {
        quiz,
        settings: &settings,
        now,
        ignore_time_limits,
        remote_addr,
    });

    let num_prior_attempts =
        repositories::attempts::count_non_preview(state.db(), &quiz.id, user_id).await?;
    let last_attempt = repositories::attempts::last_attempt(state.db(), &quiz.id, user_id).await?;

    Ok(QuizAccess { manager, settings, num_prior_attempts, last_attempt })
}

/// Creates (or resumes) an attempt. Question selection and usage start run
/// before the attempt transaction; the usage is released again if the row
/// cannot be created.
pub async fn start_attempt(
    state: &AppState,
    quiz: &Quiz,
    settings: &EffectiveSettings,
    user_id: &str,
    preview: bool,
    now: i64,
) -> Result<Attempt, AttemptError> {
    if quiz.grade > GRADE_EPSILON && quiz.sum_grades < GRADE_EPSILON {
        return Err(AttemptError::MisconfiguredQuiz);
    }

    if let Some(existing) =
        repositories::attempts::find_unfinished(state.db(), &quiz.id, user_id).await?
    {
        return Ok(existing);
    }

    let usage_id = state
        .question_engine()
        .start_usage(&quiz.id, user_id)
        .await
        .map_err(AttemptError::Engine)?;

    match build_and_insert(state, quiz, settings, user_id, preview, now, &usage_id).await {
        Ok(attempt) => Ok(attempt),
        Err(err) => {
            if let Err(cleanup) = state.question_engine().delete_usage(&usage_id).await {
                tracing::error!(usage_id, error = %cleanup, "Failed to release orphaned usage");
            }
            Err(err)
        }
    }
}

async fn build_and_insert(
    state: &AppState,
    quiz: &Quiz,
    settings: &EffectiveSettings,
    user_id: &str,
    preview: bool,
    now: i64,
    usage_id: &str,
) -> Result<Attempt, AttemptError> {
    let prior = repositories::attempts::last_attempt(state.db(), &quiz.id, user_id).await?;

    let (layout_string, bindings) = match prior.as_ref().filter(|_| quiz.attempt_on_last) {
        Some(prior) => {
            let bindings =
                repositories::attempts::list_question_bindings(state.db(), &prior.id).await?;
            for (slot, _) in &bindings {
                state
                    .question_engine()
                    .clone_question_state(usage_id, &prior.usage_id, *slot)
                    .await
                    .map_err(AttemptError::Engine)?;
            }
            (prior.layout.clone(), bindings)
        }
        None => select_questions(state, quiz, user_id, usage_id).await?,
    };

    state
        .question_engine()
        .start_all_questions(usage_id, VariantStrategy::Random, now, user_id)
        .await
        .map_err(AttemptError::Engine)?;

    let deadline = deadline_from(settings, now);
    let time_check_state = if preview { None } else { deadline };

    let attempt_id = Uuid::new_v4().to_string();
    let stamp = primitive_now_utc();

    let mut tx = state.db().begin().await?;
    repositories::attempts::acquire_quiz_user_lock(&mut *tx, &quiz.id, user_id).await?;

    if let Some(existing) =
        repositories::attempts::find_unfinished(&mut *tx, &quiz.id, user_id).await?
    {
        tx.commit().await?;
        return Ok(existing);
    }

    let number = repositories::attempts::max_attempt_number(&mut *tx, &quiz.id, user_id).await? + 1;

    let inserted = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            quiz_id: &quiz.id,
            user_id,
            attempt: number,
            usage_id,
            state: AttemptState::Inprogress,
            time_start: now,
            time_modified: now,
            time_check_state,
            layout: &layout_string,
            preview,
            created_at: stamp,
        },
    )
    .await?;

    if !inserted {
        return Err(AttemptError::Conflict(attempt_id));
    }

    for (slot, question_id) in &bindings {
        repositories::attempts::insert_question_binding(&mut *tx, &attempt_id, *slot, question_id)
            .await?;
    }

    tx.commit().await?;

    repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await?
        .ok_or(AttemptError::NotFound(attempt_id))
}

/// Resolves every slot to a concrete question and registers it with the
/// usage. Random slots draw from their category pool, skipping questions the
/// user has met in earlier attempts while fresh ones remain.
async fn select_questions(
    state: &AppState,
    quiz: &Quiz,
    user_id: &str,
    usage_id: &str,
) -> Result<(String, Vec<(i32, String)>), AttemptError> {
    let sections = repositories::slots::list_sections(state.db(), &quiz.id).await?;
    let slots = repositories::slots::list_slots(state.db(), &quiz.id).await?;
    let used: HashSet<String> =
        repositories::attempts::list_used_question_ids(state.db(), &quiz.id, user_id)
            .await?
            .into_iter()
            .collect();

    let mut rng = StdRng::seed_from_u64(rand::random::<u64>());
    let mut category_cache: HashMap<String, Vec<crate::db::models::Question>> = HashMap::new();
    let mut bindings = Vec::with_capacity(slots.len());

    for slot in &slots {
        let question_id = if let Some(question_id) = &slot.question_id {
            question_id.clone()
        } else {
            let category = slot.random_category_id.clone().unwrap_or_default();
            if !category_cache.contains_key(&category) {
                let candidates =
                    repositories::slots::list_questions_in_category(state.db(), &category).await?;
                category_cache.insert(category.clone(), candidates);
            }
            let candidates = &category_cache[&category];
            layout::select_random_question(candidates, &slot.random_tags.0, &used, &mut rng)
                .ok_or_else(|| AttemptError::NotEnoughQuestions {
                    slot: slot.slot,
                    category: category.clone(),
                })?
        };

        state
            .question_engine()
            .add_question(usage_id, &question_id, slot.max_mark)
            .await
            .map_err(AttemptError::Engine)?;
        bindings.push((slot.slot, question_id));
    }

    let groups = layout::section_slot_groups(&sections, &slots);
    let tokens = layout::build_layout(&groups, quiz.questions_per_page, &mut rng);
    Ok((layout::format_layout(&tokens), bindings))
}

/// Checks one attempt against its deadline and applies whatever transition
/// is due. Invoked by live requests that notice staleness and by the sweeper;
/// both paths serialize on the attempt row and terminal states are no-ops,
/// so concurrent calls are safe to race.
pub async fn handle_time_expiry(
    state: &AppState,
    attempt_id: &str,
    now: i64,
) -> Result<Attempt, AttemptError> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;
    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.quiz_id.clone()))?;
    let settings = effective_settings::resolve(state.db(), &quiz, &attempt.user_id).await?;
    handle_time_expiry_with(state, attempt_id, &quiz, &settings, now).await
}

/// Expiry check with quiz and settings already resolved; the sweeper uses
/// this form to reuse its per-quiz cache.
pub async fn handle_time_expiry_with(
    state: &AppState,
    attempt_id: &str,
    quiz: &Quiz,
    settings: &EffectiveSettings,
    now: i64,
) -> Result<Attempt, AttemptError> {
    let mut tx = state.db().begin().await?;
    let attempt = repositories::attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;

    if attempt.state.is_terminal() {
        tx.commit().await?;
        return Ok(attempt);
    }

    let deadline = effective_deadline(settings, &attempt);
    let action =
        expiry_action(quiz.overdue_handling, attempt.state, deadline, quiz.grace_period, now);

    match action {
        ExpiryAction::None => {
            let check =
                next_check_time(quiz.overdue_handling, attempt.state, deadline, quiz.grace_period);
            let check = if attempt.preview { None } else { check };
            if check != attempt.time_check_state {
                repositories::attempts::update_check_state(
                    &mut *tx,
                    attempt_id,
                    check,
                    now,
                    primitive_now_utc(),
                )
                .await?;
            }
            tx.commit().await?;
            repositories::attempts::find_by_id(state.db(), attempt_id)
                .await?
                .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
        }
        ExpiryAction::MarkOverdue { until } => {
            let applied = repositories::attempts::apply_transition(
                &mut *tx,
                repositories::attempts::StateTransition {
                    id: attempt_id,
                    expected: attempt.state,
                    state: AttemptState::Overdue,
                    time_finish: 0,
                    time_modified: now,
                    time_check_state: Some(until),
                    sum_grades: attempt.sum_grades,
                },
                primitive_now_utc(),
            )
            .await?;
            tx.commit().await?;
            if !applied {
                return Err(AttemptError::Conflict(attempt_id.to_string()));
            }
            repositories::attempts::find_by_id(state.db(), attempt_id)
                .await?
                .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
        }
        ExpiryAction::Finish => {
            finalize_in_tx(state, tx, &attempt, quiz, now).await
        }
        ExpiryAction::Abandon => {
            let applied = repositories::attempts::apply_transition(
                &mut *tx,
                repositories::attempts::StateTransition {
                    id: attempt_id,
                    expected: attempt.state,
                    state: AttemptState::Abandoned,
                    time_finish: now,
                    time_modified: now,
                    time_check_state: None,
                    sum_grades: attempt.sum_grades,
                },
                primitive_now_utc(),
            )
            .await?;
            tx.commit().await?;
            if !applied {
                return Err(AttemptError::Conflict(attempt_id.to_string()));
            }
            if !attempt.preview {
                grading::recompute_user_grade(state, quiz, &attempt.user_id)
                    .await
                    .map_err(AttemptError::Storage)?;
            }
            repositories::attempts::find_by_id(state.db(), attempt_id)
                .await?
                .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
        }
    }
}

/// Explicit submission by the user. Terminal states are returned unchanged.
pub async fn finish_attempt(
    state: &AppState,
    attempt_id: &str,
    now: i64,
) -> Result<Attempt, AttemptError> {
    let mut tx = state.db().begin().await?;
    let attempt = repositories::attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;

    if attempt.state.is_terminal() {
        tx.commit().await?;
        return Ok(attempt);
    }

    let quiz = repositories::quizzes::find_by_id(&mut *tx, &attempt.quiz_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.quiz_id.clone()))?;

    let finished = finalize_in_tx(state, tx, &attempt, &quiz, now).await?;

    let context = serde_json::json!({
        "quiz": quiz.name,
        "attempt": finished.attempt,
        "submitted_at": now,
    });
    notifications::send_best_effort(
        state.notifier(),
        TEMPLATE_SUBMISSION_CONFIRMATION,
        &finished.user_id,
        &context,
    )
    .await;
    notifications::send_best_effort(
        state.notifier(),
        TEMPLATE_SUBMISSION_NOTICE,
        &quiz.course_id,
        &context,
    )
    .await;

    Ok(finished)
}

/// Shared finalization: close the usage, record its total as the attempt's
/// raw mark, and move to FINISHED. The caller holds the row lock in `tx`.
/// Grade aggregation runs after commit in its own transaction.
async fn finalize_in_tx(
    state: &AppState,
    mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
    attempt: &Attempt,
    quiz: &Quiz,
    now: i64,
) -> Result<Attempt, AttemptError> {
    state
        .question_engine()
        .finish_all(&attempt.usage_id, now)
        .await
        .map_err(AttemptError::Engine)?;
    let total = state
        .question_engine()
        .total_mark(&attempt.usage_id)
        .await
        .map_err(AttemptError::Engine)?;

    let applied = repositories::attempts::apply_transition(
        &mut *tx,
        repositories::attempts::StateTransition {
            id: &attempt.id,
            expected: attempt.state,
            state: AttemptState::Finished,
            time_finish: now,
            time_modified: now,
            time_check_state: None,
            sum_grades: total,
        },
        primitive_now_utc(),
    )
    .await?;
    tx.commit().await?;

    if !applied {
        return Err(AttemptError::Conflict(attempt.id.clone()));
    }

    if !attempt.preview {
        grading::recompute_user_grade(state, quiz, &attempt.user_id)
            .await
            .map_err(AttemptError::Storage)?;
    }

    repositories::attempts::find_by_id(state.db(), &attempt.id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.id.clone()))
}

/// Terminal transition without mark finalization: the user walked away and
/// the policy does not auto-submit.
pub async fn abandon_attempt(
    state: &AppState,
    attempt_id: &str,
    now: i64,
) -> Result<Attempt, AttemptError> {
    let mut tx = state.db().begin().await?;
    let attempt = repositories::attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;

    if attempt.state.is_terminal() {
        tx.commit().await?;
        return Ok(attempt);
    }

    let quiz = repositories::quizzes::find_by_id(&mut *tx, &attempt.quiz_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.quiz_id.clone()))?;

    let applied = repositories::attempts::apply_transition(
        &mut *tx,
        repositories::attempts::StateTransition {
            id: attempt_id,
            expected: attempt.state,
            state: AttemptState::Abandoned,
            time_finish: now,
            time_modified: now,
            time_check_state: None,
            sum_grades: attempt.sum_grades,
        },
        primitive_now_utc(),
    )
    .await?;
    tx.commit().await?;

    if !applied {
        return Err(AttemptError::Conflict(attempt_id.to_string()));
    }

    if !attempt.preview {
        grading::recompute_user_grade(state, &quiz, &attempt.user_id)
            .await
            .map_err(AttemptError::Storage)?;
    }

    repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
}

/// Removes the attempt and its usage, then brings the user's cached grade
/// back in line with whatever attempts remain.
pub async fn delete_attempt(state: &AppState, attempt_id: &str) -> Result<(), AttemptError> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;
    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.quiz_id.clone()))?;

    state
        .question_engine()
        .delete_usage(&attempt.usage_id)
        .await
        .map_err(AttemptError::Engine)?;

    repositories::attempts::delete(state.db(), attempt_id).await?;

    if !attempt.preview {
        grading::recompute_user_grade(state, &quiz, &attempt.user_id)
            .await
            .map_err(AttemptError::Storage)?;
    }

    Ok(())
}

/// Moves the current page, clamped to the layout. Only meaningful while the
/// attempt is in progress.
pub async fn navigate(
    state: &AppState,
    attempt_id: &str,
    requested_page: i32,
    now: i64,
) -> Result<PageRequest, AttemptError> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))?;

    if attempt.state != AttemptState::Inprogress {
        return Err(AttemptError::NotInProgress(attempt_id.to_string()));
    }

    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await?
        .ok_or_else(|| AttemptError::NotFound(attempt.quiz_id.clone()))?;

    let outcome = resolve_page_request(
        attempt.current_page,
        requested_page,
        layout::last_page(&attempt.layout),
        quiz.navigation_method,
    );

    if let PageRequest::Show(page) = outcome {
        if page != attempt.current_page {
            repositories::attempts::set_current_page(
                state.db(),
                attempt_id,
                page,
                now,
                primitive_now_utc(),
            )
            .await?;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn settings(close: i64, limit: i64) -> EffectiveSettings {
        EffectiveSettings {
            time_open: 0,
            time_close: close,
            time_limit: limit,
            attempts: 0,
            password: None,
            extra_passwords: Vec::new(),
        }
    }

    #[test]
    fn deadline_is_min_of_close_and_limit() {
        assert_eq!(deadline_from(&settings(0, 0), 100), None);
        assert_eq!(deadline_from(&settings(500, 0), 100), Some(500));
        assert_eq!(deadline_from(&settings(0, 300), 100), Some(400));
        assert_eq!(deadline_from(&settings(350, 300), 100), Some(350));
        assert_eq!(deadline_from(&settings(900, 300), 100), Some(400));
    }

    #[test]
    fn no_action_before_deadline() {
        let action = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Inprogress,
            Some(1800),
            600,
            1000,
        );
        assert_eq!(action, ExpiryAction::None);
    }

    #[test]
    fn grace_policy_goes_overdue_at_deadline() {
        let action = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Inprogress,
            Some(1800),
            600,
            2000,
        );
        assert_eq!(action, ExpiryAction::MarkOverdue { until: 2400 });
    }

    #[test]
    fn grace_policy_finishes_after_grace() {
        let action = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Overdue,
            Some(1800),
            600,
            2400,
        );
        assert_eq!(action, ExpiryAction::Finish);
    }

    #[test]
    fn skipped_sweep_collapses_both_boundaries_into_one_finish() {
        // No sweep ran between the deadline and deadline+grace; a single
        // call must go straight from IN_PROGRESS to finished.
        let action = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Inprogress,
            Some(1800),
            600,
            2500,
        );
        assert_eq!(action, ExpiryAction::Finish);
    }

    #[test]
    fn autosubmit_finishes_at_deadline() {
        let action = expiry_action(
            OverdueHandling::Autosubmit,
            AttemptState::Inprogress,
            Some(1800),
            0,
            1800,
        );
        assert_eq!(action, ExpiryAction::Finish);
    }

    #[test]
    fn autoabandon_abandons_at_deadline() {
        let action = expiry_action(
            OverdueHandling::Autoabandon,
            AttemptState::Inprogress,
            Some(1800),
            0,
            1801,
        );
        assert_eq!(action, ExpiryAction::Abandon);
    }

    #[test]
    fn expiry_is_idempotent_against_resulting_state() {
        // First call at T=2000 marks the attempt overdue; a second call at
        // the same instant against the new state decides nothing further.
        let first = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Inprogress,
            Some(1800),
            600,
            2000,
        );
        assert_eq!(first, ExpiryAction::MarkOverdue { until: 2400 });

        let second = expiry_action(
            OverdueHandling::Graceperiod,
            AttemptState::Overdue,
            Some(1800),
            600,
            2000,
        );
        assert_eq!(second, ExpiryAction::None);
    }

    #[test]
    fn terminal_states_never_transition() {
        for state in [AttemptState::Finished, AttemptState::Abandoned] {
            for policy in [
                OverdueHandling::Autosubmit,
                OverdueHandling::Graceperiod,
                OverdueHandling::Autoabandon,
            ] {
                assert_eq!(
                    expiry_action(policy, state, Some(0), 0, i64::MAX),
                    ExpiryAction::None
                );
            }
        }
    }

    #[test]
    fn unbounded_attempts_are_never_swept() {
        let action = expiry_action(
            OverdueHandling::Autosubmit,
            AttemptState::Inprogress,
            None,
            0,
            i64::MAX,
        );
        assert_eq!(action, ExpiryAction::None);
        assert_eq!(
            next_check_time(OverdueHandling::Autosubmit, AttemptState::Inprogress, None, 0),
            None
        );
    }

    #[test]
    fn next_check_time_tracks_the_pending_boundary() {
        assert_eq!(
            next_check_time(
                OverdueHandling::Graceperiod,
                AttemptState::Inprogress,
                Some(1800),
                600
            ),
            Some(1800)
        );
        assert_eq!(
            next_check_time(OverdueHandling::Graceperiod, AttemptState::Overdue, Some(1800), 600),
            Some(2400)
        );
        assert_eq!(
            next_check_time(OverdueHandling::Graceperiod, AttemptState::Finished, Some(1800), 600),
            None
        );
    }

    #[test]
    fn page_requests_clamp_and_redirect() {
        use NavigationMethod::*;
        assert_eq!(resolve_page_request(0, 2, 4, Free), PageRequest::Show(2));
        assert_eq!(resolve_page_request(0, 9, 4, Free), PageRequest::Redirect(4));
        assert_eq!(resolve_page_request(2, -1, 4, Free), PageRequest::Redirect(0));
        assert_eq!(resolve_page_request(2, 1, 4, Free), PageRequest::Show(1));
    }

    #[test]
    fn sequential_navigation_forbids_going_back() {
        use NavigationMethod::Sequential;
        assert_eq!(resolve_page_request(2, 1, 4, Sequential), PageRequest::Redirect(2));
        assert_eq!(resolve_page_request(2, 3, 4, Sequential), PageRequest::Show(3));
        // Clamping an overshoot below the current page also refuses to move.
        assert_eq!(resolve_page_request(2, -5, 4, Sequential), PageRequest::Redirect(2));
    }

    #[test]
    fn misconfigured_quiz_is_rejected_before_any_work() {
        let mut quiz = test_support::quiz("q1");
        quiz.grade = 10.0;
        quiz.sum_grades = 0.0;
        assert!(quiz.grade > GRADE_EPSILON && quiz.sum_grades < GRADE_EPSILON);
    }
}
