use time::macros::datetime;
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, Quiz, QuizOverride};
use crate::db::types::{
    AttemptState, BrowserSecurity, GradingMethod, NavigationMethod, OverdueHandling,
};

pub(crate) const FIXTURE_STAMP: PrimitiveDateTime = datetime!(2026-01-01 00:00);

pub(crate) fn quiz(id: &str) -> Quiz {
    Quiz {
        id: id.to_string(),
        course_id: "course-1".to_string(),
        name: "Quiz".to_string(),
        grading_method: GradingMethod::Highest,
        time_open: 0,
        time_close: 0,
        time_limit: 0,
        overdue_handling: OverdueHandling::Autosubmit,
        grace_period: 0,
        grace_period_min: 60,
        max_attempts: 0,
        attempt_on_last: false,
        questions_per_page: 1,
        navigation_method: NavigationMethod::Free,
        sum_grades: 100.0,
        grade: 100.0,
        decimal_points: 2,
        review_marks: 0,
        review_feedback: 0,
        review_right_answer: 0,
        review_general_feedback: 0,
        password: None,
        subnet: None,
        delay_attempt1: 0,
        delay_attempt2: 0,
        browser_security: BrowserSecurity::None,
        created_at: FIXTURE_STAMP,
        updated_at: FIXTURE_STAMP,
    }
}

pub(crate) fn attempt(quiz_id: &str, user_id: &str, number: i32) -> Attempt {
    Attempt {
        id: format!("attempt-{quiz_id}-{user_id}-{number}"),
        quiz_id: quiz_id.to_string(),
        user_id: user_id.to_string(),
        attempt: number,
        usage_id: format!("usage-{quiz_id}-{user_id}-{number}"),
        state: AttemptState::Inprogress,
        time_start: 0,
        time_finish: 0,
        time_modified: 0,
        time_check_state: None,
        current_page: 0,
        sum_grades: None,
        layout: "1,0".to_string(),
        preview: false,
        created_at: FIXTURE_STAMP,
        updated_at: FIXTURE_STAMP,
    }
}

pub(crate) fn user_override(quiz_id: &str, user_id: &str) -> QuizOverride {
    QuizOverride {
        id: format!("override-{quiz_id}-{user_id}"),
        quiz_id: quiz_id.to_string(),
        user_id: Some(user_id.to_string()),
        group_id: None,
        time_open: None,
        time_close: None,
        time_limit: None,
        attempts: None,
        password: None,
        created_at: FIXTURE_STAMP,
        updated_at: FIXTURE_STAMP,
    }
}

pub(crate) fn group_override(quiz_id: &str, group_id: &str) -> QuizOverride {
    QuizOverride {
        id: format!("override-{quiz_id}-{group_id}"),
        quiz_id: quiz_id.to_string(),
        user_id: None,
        group_id: Some(group_id.to_string()),
        time_open: None,
        time_close: None,
        time_limit: None,
        attempts: None,
        password: None,
        created_at: FIXTURE_STAMP,
        updated_at: FIXTURE_STAMP,
    }
}
