use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Attempt;
use crate::db::types::AttemptState;

pub(crate) const COLUMNS: &str = "\
    id, quiz_id, user_id, attempt, usage_id, state, time_start, time_finish, \
    time_modified, time_check_state, current_page, sum_grades, layout, preview, \
    created_at, updated_at";

pub struct CreateAttempt<'a> {
    pub id: &'a str,
    pub quiz_id: &'a str,
    pub user_id: &'a str,
    pub attempt: i32,
    pub usage_id: &'a str,
    pub state: AttemptState,
    pub time_start: i64,
    pub time_modified: i64,
    pub time_check_state: Option<i64>,
    pub layout: &'a str,
    pub preview: bool,
    pub created_at: PrimitiveDateTime,
}

pub async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locked read used by every attempt mutation so live requests and the
/// sweeper serialize their read-modify-write on one attempt.
pub async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Serializes concurrent attempt creation for one (quiz, user) pair for the
/// duration of the surrounding transaction.
pub async fn acquire_quiz_user_lock(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("attempt:{quiz_id}:{user_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find_unfinished(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE quiz_id = $1 AND user_id = $2 AND state IN ($3, $4) \
         ORDER BY attempt DESC LIMIT 1"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .bind(AttemptState::Inprogress)
    .bind(AttemptState::Overdue)
    .fetch_optional(executor)
    .await
}

pub async fn last_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE quiz_id = $1 AND user_id = $2 AND preview = FALSE \
         ORDER BY attempt DESC LIMIT 1"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Next attempt numbering counts previews too, since the sequence number is
/// unique per (quiz, user) regardless of preview status.
pub async fn max_attempt_number(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(attempt), 0) FROM attempts WHERE quiz_id = $1 AND user_id = $2",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn count_non_preview(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM attempts \
         WHERE quiz_id = $1 AND user_id = $2 AND preview = FALSE",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Attempts eligible for grade aggregation: non-preview with a known mark,
/// in attempt order.
pub async fn list_graded(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE quiz_id = $1 AND user_id = $2 AND preview = FALSE \
           AND sum_grades IS NOT NULL \
         ORDER BY attempt"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn list_users_with_attempts(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT user_id FROM attempts WHERE quiz_id = $1 AND preview = FALSE",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn list_previews(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE quiz_id = $1 AND preview = TRUE"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

/// Attempts the sweeper must re-examine: unfinished, with a check time at or
/// before the horizon, ordered by (course, quiz) so per-quiz lookups batch.
pub async fn list_due(
    pool: &PgPool,
    process_up_to: i64,
    limit: i64,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT a.{} FROM attempts a \
         JOIN quizzes q ON q.id = a.quiz_id \
         WHERE a.state IN ($1, $2) AND a.time_check_state IS NOT NULL \
           AND a.time_check_state <= $3 \
         ORDER BY q.course_id, a.quiz_id, a.id \
         LIMIT $4",
        COLUMNS.replace(", ", ", a.")
    ))
    .bind(AttemptState::Inprogress)
    .bind(AttemptState::Overdue)
    .bind(process_up_to)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, quiz_id, user_id, attempt, usage_id, state, time_start,
            time_modified, time_check_state, layout, preview, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.quiz_id)
    .bind(attempt.user_id)
    .bind(attempt.attempt)
    .bind(attempt.usage_id)
    .bind(attempt.state)
    .bind(attempt.time_start)
    .bind(attempt.time_modified)
    .bind(attempt.time_check_state)
    .bind(attempt.layout)
    .bind(attempt.preview)
    .bind(attempt.created_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub struct StateTransition<'a> {
    pub id: &'a str,
    pub expected: AttemptState,
    pub state: AttemptState,
    pub time_finish: i64,
    pub time_modified: i64,
    pub time_check_state: Option<i64>,
    pub sum_grades: Option<f64>,
}

/// Guarded state write: only applies while the row is still in the expected
/// state, so a concurrent transition turns into a detectable no-op.
pub async fn apply_transition(
    executor: impl sqlx::PgExecutor<'_>,
    transition: StateTransition<'_>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts SET state = $1, time_finish = $2, time_modified = $3, \
         time_check_state = $4, sum_grades = $5, updated_at = $6 \
         WHERE id = $7 AND state = $8",
    )
    .bind(transition.state)
    .bind(transition.time_finish)
    .bind(transition.time_modified)
    .bind(transition.time_check_state)
    .bind(transition.sum_grades)
    .bind(now)
    .bind(transition.id)
    .bind(transition.expected)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_check_state(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    time_check_state: Option<i64>,
    time_modified: i64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempts SET time_check_state = $1, time_modified = $2, updated_at = $3 \
         WHERE id = $4",
    )
    .bind(time_check_state)
    .bind(time_modified)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn set_current_page(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    page: i32,
    time_modified: i64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempts SET current_page = $1, time_modified = $2, updated_at = $3 \
         WHERE id = $4",
    )
    .bind(page)
    .bind(time_modified)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete(executor: impl sqlx::PgExecutor<'_>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attempts WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_question_binding(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    slot: i32,
    question_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempt_questions (attempt_id, slot, question_id) VALUES ($1,$2,$3)",
    )
    .bind(attempt_id)
    .bind(slot)
    .bind(question_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_question_bindings(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<(i32, String)>, sqlx::Error> {
    let rows: Vec<(i32, String)> = sqlx::query_as(
        "SELECT slot, question_id FROM attempt_questions WHERE attempt_id = $1 ORDER BY slot",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Question ids this user has already seen in any attempt at this quiz; the
/// random loader avoids these when it can.
pub async fn list_used_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT aq.question_id FROM attempt_questions aq \
         JOIN attempts a ON a.id = aq.attempt_id \
         WHERE a.quiz_id = $1 AND a.user_id = $2",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
}
