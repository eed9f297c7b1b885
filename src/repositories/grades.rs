use uuid::Uuid;

use crate::db::models::{FeedbackBoundary, QuizGrade};

pub async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<Option<QuizGrade>, sqlx::Error> {
    sqlx::query_as::<_, QuizGrade>(
        "SELECT id, quiz_id, user_id, grade, time_modified FROM quiz_grades \
         WHERE quiz_id = $1 AND user_id = $2",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
    grade: f64,
    time_modified: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_grades (id, quiz_id, user_id, grade, time_modified) \
         VALUES ($1,$2,$3,$4,$5) \
         ON CONFLICT (quiz_id, user_id) \
         DO UPDATE SET grade = EXCLUDED.grade, time_modified = EXCLUDED.time_modified",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(quiz_id)
    .bind(user_id)
    .bind(grade)
    .bind(time_modified)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_all(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuizGrade>, sqlx::Error> {
    sqlx::query_as::<_, QuizGrade>(
        "SELECT id, quiz_id, user_id, grade, time_modified FROM quiz_grades \
         WHERE quiz_id = $1 ORDER BY user_id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_grades WHERE quiz_id = $1 AND user_id = $2")
        .bind(quiz_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_grades WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// O(1)-per-row proportional rescale used when the quiz's display grade
/// changes and the old grade was non-zero.
pub async fn scale_all(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    factor: f64,
    time_modified: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_grades SET grade = grade * $1, time_modified = $2 WHERE quiz_id = $3",
    )
    .bind(factor)
    .bind(time_modified)
    .bind(quiz_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_boundaries(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<FeedbackBoundary>, sqlx::Error> {
    sqlx::query_as::<_, FeedbackBoundary>(
        "SELECT id, quiz_id, feedback_text, min_grade, max_grade FROM quiz_feedback \
         WHERE quiz_id = $1 ORDER BY min_grade DESC",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn create_boundary(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    quiz_id: &str,
    feedback_text: &str,
    min_grade: f64,
    max_grade: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_feedback (id, quiz_id, feedback_text, min_grade, max_grade) \
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(id)
    .bind(quiz_id)
    .bind(feedback_text)
    .bind(min_grade)
    .bind(max_grade)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn scale_boundaries(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    factor: f64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_feedback SET min_grade = min_grade * $1, max_grade = max_grade * $1 \
         WHERE quiz_id = $2",
    )
    .bind(factor)
    .bind(quiz_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
