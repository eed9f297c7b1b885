use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Quiz;
use crate::db::types::{
    BrowserSecurity, GradingMethod, NavigationMethod, OverdueHandling,
};

pub(crate) const COLUMNS: &str = "\
    id, course_id, name, grading_method, time_open, time_close, time_limit, \
    overdue_handling, grace_period, grace_period_min, max_attempts, attempt_on_last, \
    questions_per_page, navigation_method, sum_grades, grade, decimal_points, \
    review_marks, review_feedback, review_right_answer, review_general_feedback, \
    password, subnet, delay_attempt1, delay_attempt2, browser_security, \
    created_at, updated_at";

pub struct CreateQuiz<'a> {
    pub id: &'a str,
    pub course_id: &'a str,
    pub name: &'a str,
    pub grading_method: GradingMethod,
    pub time_open: i64,
    pub time_close: i64,
    pub time_limit: i64,
    pub overdue_handling: OverdueHandling,
    pub grace_period: i64,
    pub grace_period_min: i64,
    pub max_attempts: i32,
    pub attempt_on_last: bool,
    pub questions_per_page: i32,
    pub navigation_method: NavigationMethod,
    pub grade: f64,
    pub decimal_points: i32,
    pub password: Option<&'a str>,
    pub subnet: Option<&'a str>,
    pub delay_attempt1: i64,
    pub delay_attempt2: i64,
    pub browser_security: BrowserSecurity,
    pub created_at: PrimitiveDateTime,
}

pub async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_by_course(pool: &PgPool, course_id: &str) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY id"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    quiz: CreateQuiz<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quizzes (
            id, course_id, name, grading_method, time_open, time_close, time_limit,
            overdue_handling, grace_period, grace_period_min, max_attempts, attempt_on_last,
            questions_per_page, navigation_method, grade, decimal_points, password, subnet,
            delay_attempt1, delay_attempt2, browser_security, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$22)",
    )
    .bind(quiz.id)
    .bind(quiz.course_id)
    .bind(quiz.name)
    .bind(quiz.grading_method)
    .bind(quiz.time_open)
    .bind(quiz.time_close)
    .bind(quiz.time_limit)
    .bind(quiz.overdue_handling)
    .bind(quiz.grace_period)
    .bind(quiz.grace_period_min)
    .bind(quiz.max_attempts)
    .bind(quiz.attempt_on_last)
    .bind(quiz.questions_per_page)
    .bind(quiz.navigation_method)
    .bind(quiz.grade)
    .bind(quiz.decimal_points)
    .bind(quiz.password)
    .bind(quiz.subnet)
    .bind(quiz.delay_attempt1)
    .bind(quiz.delay_attempt2)
    .bind(quiz.browser_security)
    .bind(quiz.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_sum_grades(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    sum_grades: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quizzes SET sum_grades = $1, updated_at = $2 WHERE id = $3")
        .bind(sum_grades)
        .bind(now)
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_grade(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    grade: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quizzes SET grade = $1, updated_at = $2 WHERE id = $3")
        .bind(grade)
        .bind(now)
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(())
}
