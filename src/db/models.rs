use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AttemptState, BrowserSecurity, GradingMethod, NavigationMethod, OverdueHandling,
};

/// Quiz configuration. Window and duration fields are unix seconds with
/// 0 meaning "no bound"; `sum_grades` is kept equal to the sum of slot
/// max marks by the structure-editing operations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    pub name: String,
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
    pub sum_grades: f64,
    pub grade: f64,
    pub decimal_points: i32,
    pub review_marks: i32,
    pub review_feedback: i32,
    pub review_right_answer: i32,
    pub review_general_feedback: i32,
    pub password: Option<String>,
    pub subnet: Option<String>,
    pub delay_attempt1: i64,
    pub delay_attempt2: i64,
    pub browser_security: BrowserSecurity,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizSection {
    pub id: String,
    pub quiz_id: String,
    pub first_slot: i32,
    pub heading: String,
    pub shuffle: bool,
}

/// One position in the question sequence: either a fixed question or a
/// random selector resolved at attempt start.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizSlot {
    pub id: String,
    pub quiz_id: String,
    pub slot: i32,
    pub max_mark: f64,
    pub question_id: Option<String>,
    pub random_category_id: Option<String>,
    pub random_tags: Json<Vec<String>>,
}

/// Minimal projection of the external question bank: just enough for the
/// random-slot loader's category and tag filters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub tags: Json<Vec<String>>,
    pub default_mark: f64,
}

/// Per-user or per-group replacement of quiz timing fields. NULL = inherit
/// from the quiz; 0 keeps the base field's "unbounded" meaning.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizOverride {
    pub id: String,
    pub quiz_id: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub time_open: Option<i64>,
    pub time_close: Option<i64>,
    pub time_limit: Option<i64>,
    pub attempts: Option<i32>,
    pub password: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt: i32,
    pub usage_id: String,
    pub state: AttemptState,
    pub time_start: i64,
    pub time_finish: i64,
    pub time_modified: i64,
    pub time_check_state: Option<i64>,
    pub current_page: i32,
    pub sum_grades: Option<f64>,
    pub layout: String,
    pub preview: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizGrade {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub grade: f64,
    pub time_modified: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackBoundary {
    pub id: String,
    pub quiz_id: String,
    pub feedback_text: String,
    pub min_grade: f64,
    pub max_grade: f64,
}
