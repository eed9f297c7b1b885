use sqlx::types::Json;

use crate::db::models::{Question, QuizSection, QuizSlot};

const SLOT_COLUMNS: &str =
    "id, quiz_id, slot, max_mark, question_id, random_category_id, random_tags";

pub struct CreateSlot<'a> {
    pub id: &'a str,
    pub quiz_id: &'a str,
    pub slot: i32,
    pub max_mark: f64,
    pub question_id: Option<&'a str>,
    pub random_category_id: Option<&'a str>,
    pub random_tags: Vec<String>,
}

pub async fn list_sections(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuizSection>, sqlx::Error> {
    sqlx::query_as::<_, QuizSection>(
        "SELECT id, quiz_id, first_slot, heading, shuffle FROM quiz_sections \
         WHERE quiz_id = $1 ORDER BY first_slot",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn create_section(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    quiz_id: &str,
    first_slot: i32,
    heading: &str,
    shuffle: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_sections (id, quiz_id, first_slot, heading, shuffle) \
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(id)
    .bind(quiz_id)
    .bind(first_slot)
    .bind(heading)
    .bind(shuffle)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_slots(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuizSlot>, sqlx::Error> {
    sqlx::query_as::<_, QuizSlot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM quiz_slots WHERE quiz_id = $1 ORDER BY slot"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn create_slot(
    executor: impl sqlx::PgExecutor<'_>,
    slot: CreateSlot<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_slots (id, quiz_id, slot, max_mark, question_id, \
         random_category_id, random_tags) VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(slot.id)
    .bind(slot.quiz_id)
    .bind(slot.slot)
    .bind(slot.max_mark)
    .bind(slot.question_id)
    .bind(slot.random_category_id)
    .bind(Json(slot.random_tags))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_slot(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    slot: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_slots WHERE quiz_id = $1 AND slot = $2")
        .bind(quiz_id)
        .bind(slot)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_max_mark(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    slot: i32,
    max_mark: f64,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE quiz_slots SET max_mark = $1 WHERE quiz_id = $2 AND slot = $3")
            .bind(max_mark)
            .bind(quiz_id)
            .bind(slot)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn sum_max_marks(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(max_mark), 0) FROM quiz_slots WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub async fn list_questions_in_category(
    executor: impl sqlx::PgExecutor<'_>,
    category_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT id, category_id, name, tags, default_mark FROM questions \
         WHERE category_id = $1 ORDER BY id",
    )
    .bind(category_id)
    .fetch_all(executor)
    .await
}

pub async fn find_question(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT id, category_id, name, tags, default_mark FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn create_question(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    category_id: &str,
    name: &str,
    tags: Vec<String>,
    default_mark: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (id, category_id, name, tags, default_mark) \
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(id)
    .bind(category_id)
    .bind(name)
    .bind(Json(tags))
    .bind(default_mark)
    .execute(executor)
    .await?;
    Ok(())
}
