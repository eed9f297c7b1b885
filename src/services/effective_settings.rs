use std::collections::HashMap;

use sqlx::PgPool;

use crate::db::models::{Quiz, QuizOverride};
use crate::repositories;

/// Per-user quiz settings after override resolution. Constructed once per
/// resolution and passed by value; the shared quiz config is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub time_open: i64,
    pub time_close: i64,
    pub time_limit: i64,
    pub attempts: i32,
    pub password: Option<String>,
    /// Further group-override passwords; any of them unlocks the quiz.
    pub extra_passwords: Vec<String>,
}

impl EffectiveSettings {
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            time_open: quiz.time_open,
            time_close: quiz.time_close,
            time_limit: quiz.time_limit,
            attempts: quiz.max_attempts,
            password: quiz.password.clone(),
            extra_passwords: Vec::new(),
        }
    }
}

/// Combines base settings with the user's override row and the overrides of
/// every group the user belongs to.
///
/// A non-null user-override field wins outright. Fields the user override
/// leaves unset combine across group overrides most-lenient-wins: earliest
/// open; for close, limit and attempts an explicit 0 (unbounded) beats any
/// finite value, otherwise the largest value wins. Fields no override sets
/// fall through to the quiz defaults.
pub fn apply_overrides(
    quiz: &Quiz,
    user: Option<&QuizOverride>,
    groups: &[QuizOverride],
) -> EffectiveSettings {
    let mut time_open = user.and_then(|row| row.time_open);
    let mut time_close = user.and_then(|row| row.time_close);
    let mut time_limit = user.and_then(|row| row.time_limit);
    let mut attempts = user.and_then(|row| row.attempts);
    let mut password = user.and_then(|row| row.password.clone());
    let mut extra_passwords = Vec::new();

    if time_open.is_none() {
        time_open = groups.iter().filter_map(|row| row.time_open).min();
    }
    if time_close.is_none() {
        time_close = combine_lenient(groups.iter().filter_map(|row| row.time_close));
    }
    if time_limit.is_none() {
        time_limit = combine_lenient(groups.iter().filter_map(|row| row.time_limit));
    }
    if attempts.is_none() {
        attempts = combine_lenient(groups.iter().filter_map(|row| row.attempts));
    }
    if password.is_none() {
        let mut group_passwords = groups.iter().filter_map(|row| row.password.clone());
        password = group_passwords.next();
        extra_passwords.extend(group_passwords);
    }

    EffectiveSettings {
        time_open: time_open.unwrap_or(quiz.time_open),
        time_close: time_close.unwrap_or(quiz.time_close),
        time_limit: time_limit.unwrap_or(quiz.time_limit),
        attempts: attempts.unwrap_or(quiz.max_attempts),
        password: password.or_else(|| quiz.password.clone()),
        extra_passwords,
    }
}

/// Lenient combination for fields where 0 means "unbounded": any 0 wins,
/// otherwise the largest value does.
fn combine_lenient<T: Ord + Default + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut best: Option<T> = None;
    for value in values {
        if value == T::default() {
            return Some(T::default());
        }
        best = Some(match best {
            Some(current) if current >= value => current,
            _ => value,
        });
    }
    best
}

pub async fn resolve(
    pool: &PgPool,
    quiz: &Quiz,
    user_id: &str,
) -> Result<EffectiveSettings, sqlx::Error> {
    let user = repositories::overrides::find_user_override(pool, &quiz.id, user_id).await?;
    let groups = repositories::overrides::list_group_overrides(pool, &quiz.id, user_id).await?;
    Ok(apply_overrides(quiz, user.as_ref(), &groups))
}

/// Batch form: effective settings for every quiz in a course, two queries
/// total rather than two per quiz.
pub async fn resolve_for_course(
    pool: &PgPool,
    course_id: &str,
    user_id: &str,
) -> Result<Vec<(Quiz, EffectiveSettings)>, sqlx::Error> {
    let quizzes = repositories::quizzes::list_by_course(pool, course_id).await?;
    let overrides =
        repositories::overrides::list_for_course_user(pool, course_id, user_id).await?;

    let mut user_rows: HashMap<&str, &QuizOverride> = HashMap::new();
    let mut group_rows: HashMap<&str, Vec<QuizOverride>> = HashMap::new();
    for row in &overrides {
        if row.user_id.is_some() {
            user_rows.insert(row.quiz_id.as_str(), row);
        } else {
            group_rows.entry(row.quiz_id.as_str()).or_default().push(row.clone());
        }
    }

    Ok(quizzes
        .into_iter()
        .map(|quiz| {
            let user = user_rows.get(quiz.id.as_str()).copied();
            let groups = group_rows.get(quiz.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let settings = apply_overrides(&quiz, user, groups);
            (quiz, settings)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn no_overrides_returns_quiz_defaults() {
        let mut quiz = test_support::quiz("q1");
        quiz.time_open = 100;
        quiz.time_close = 200;
        quiz.time_limit = 600;
        quiz.max_attempts = 3;
        quiz.password = Some("secret".into());

        let settings = apply_overrides(&quiz, None, &[]);
        assert_eq!(settings, EffectiveSettings::from_quiz(&quiz));
        assert_eq!(settings.time_open, 100);
        assert_eq!(settings.time_close, 200);
        assert_eq!(settings.time_limit, 600);
        assert_eq!(settings.attempts, 3);
        assert_eq!(settings.password.as_deref(), Some("secret"));
        assert!(settings.extra_passwords.is_empty());
    }

    #[test]
    fn user_override_beats_groups_on_every_field() {
        let mut quiz = test_support::quiz("q1");
        quiz.time_close = 200;

        let mut user = test_support::user_override("q1", "u1");
        user.time_close = Some(500);
        user.time_limit = Some(60);

        let mut group = test_support::group_override("q1", "g1");
        group.time_close = Some(0);
        group.time_limit = Some(0);

        let settings = apply_overrides(&quiz, Some(&user), &[group]);
        assert_eq!(settings.time_close, 500);
        assert_eq!(settings.time_limit, 60);
    }

    #[test]
    fn group_close_zero_beats_any_finite_close() {
        let quiz = test_support::quiz("q1");

        let mut g1 = test_support::group_override("q1", "g1");
        g1.time_close = Some(900);
        let mut g2 = test_support::group_override("q1", "g2");
        g2.time_close = Some(0);
        let mut g3 = test_support::group_override("q1", "g3");
        g3.time_close = Some(1500);

        let settings = apply_overrides(&quiz, None, &[g1.clone(), g2, g3.clone()]);
        assert_eq!(settings.time_close, 0);

        let settings = apply_overrides(&quiz, None, &[g1, g3]);
        assert_eq!(settings.time_close, 1500);
    }

    #[test]
    fn group_open_takes_earliest() {
        let quiz = test_support::quiz("q1");

        let mut g1 = test_support::group_override("q1", "g1");
        g1.time_open = Some(300);
        let mut g2 = test_support::group_override("q1", "g2");
        g2.time_open = Some(100);

        let settings = apply_overrides(&quiz, None, &[g1, g2]);
        assert_eq!(settings.time_open, 100);
    }

    #[test]
    fn group_attempts_unlimited_beats_finite() {
        let mut quiz = test_support::quiz("q1");
        quiz.max_attempts = 1;

        let mut g1 = test_support::group_override("q1", "g1");
        g1.attempts = Some(5);
        let mut g2 = test_support::group_override("q1", "g2");
        g2.attempts = Some(0);

        let settings = apply_overrides(&quiz, None, &[g1, g2]);
        assert_eq!(settings.attempts, 0);
    }

    #[test]
    fn first_group_password_wins_rest_become_extras() {
        let quiz = test_support::quiz("q1");

        let mut g1 = test_support::group_override("q1", "g1");
        g1.password = Some("alpha".into());
        let mut g2 = test_support::group_override("q1", "g2");
        g2.password = Some("beta".into());

        let settings = apply_overrides(&quiz, None, &[g1, g2]);
        assert_eq!(settings.password.as_deref(), Some("alpha"));
        assert_eq!(settings.extra_passwords, vec!["beta".to_string()]);
    }

    #[test]
    fn combination_is_order_independent_for_times() {
        let quiz = test_support::quiz("q1");

        let mut g1 = test_support::group_override("q1", "g1");
        g1.time_close = Some(900);
        g1.time_open = Some(50);
        let mut g2 = test_support::group_override("q1", "g2");
        g2.time_close = Some(1200);
        g2.time_open = Some(80);

        let forward = apply_overrides(&quiz, None, &[g1.clone(), g2.clone()]);
        let reverse = apply_overrides(&quiz, None, &[g2, g1]);
        assert_eq!(forward.time_close, reverse.time_close);
        assert_eq!(forward.time_open, reverse.time_open);
    }
}
