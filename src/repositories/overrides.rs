use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::QuizOverride;

const COLUMNS: &str = "\
    id, quiz_id, user_id, group_id, time_open, time_close, time_limit, \
    attempts, password, created_at, updated_at";

pub struct CreateOverride<'a> {
    pub id: &'a str,
    pub quiz_id: &'a str,
    pub user_id: Option<&'a str>,
    pub group_id: Option<&'a str>,
    pub time_open: Option<i64>,
    pub time_close: Option<i64>,
    pub time_limit: Option<i64>,
    pub attempts: Option<i32>,
    pub password: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
}

pub async fn find_user_override(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Option<QuizOverride>, sqlx::Error> {
    sqlx::query_as::<_, QuizOverride>(&format!(
        "SELECT {COLUMNS} FROM quiz_overrides WHERE quiz_id = $1 AND user_id = $2"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_group_overrides(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Vec<QuizOverride>, sqlx::Error> {
    sqlx::query_as::<_, QuizOverride>(&format!(
        "SELECT {COLUMNS} FROM quiz_overrides \
         WHERE quiz_id = $1 AND group_id IN \
             (SELECT group_id FROM group_members WHERE user_id = $2) \
         ORDER BY id"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// All overrides relevant to one user across every quiz of a course, for the
/// batch form of settings resolution.
pub async fn list_for_course_user(
    pool: &PgPool,
    course_id: &str,
    user_id: &str,
) -> Result<Vec<QuizOverride>, sqlx::Error> {
    sqlx::query_as::<_, QuizOverride>(&format!(
        "SELECT o.{} FROM quiz_overrides o \
         JOIN quizzes q ON q.id = o.quiz_id \
         WHERE q.course_id = $1 AND (o.user_id = $2 OR o.group_id IN \
             (SELECT group_id FROM group_members WHERE user_id = $2)) \
         ORDER BY o.id",
        COLUMNS.replace(", ", ", o.")
    ))
    .bind(course_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    row: CreateOverride<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_overrides (id, quiz_id, user_id, group_id, time_open, \
         time_close, time_limit, attempts, password, created_at, updated_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)",
    )
    .bind(row.id)
    .bind(row.quiz_id)
    .bind(row.user_id)
    .bind(row.group_id)
    .bind(row.time_open)
    .bind(row.time_close)
    .bind(row.time_limit)
    .bind(row.attempts)
    .bind(row.password)
    .bind(row.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_overrides WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn add_group_member(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO group_members (group_id, user_id) VALUES ($1,$2) ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}
