use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, unix_now};
use crate::db::models::{Attempt, FeedbackBoundary, Quiz};
use crate::db::types::GradingMethod;
use crate::repositories;
use crate::services::gradebook;

/// Grades closer to zero than this are treated as zero, which matters when
/// deciding whether a proportional rescale is possible.
pub const GRADE_EPSILON: f64 = 1e-7;

/// Combines the raw marks of one user's eligible attempts (non-preview, mark
/// known, in attempt order) into a single raw grade. `None` when no attempt
/// qualifies.
pub fn aggregate_raw(method: GradingMethod, attempts: &[Attempt]) -> Option<f64> {
    let marks: Vec<f64> = attempts.iter().filter_map(|attempt| attempt.sum_grades).collect();
    if marks.is_empty() {
        return None;
    }

    match method {
        GradingMethod::Highest => marks.iter().copied().reduce(f64::max),
        GradingMethod::Average => Some(marks.iter().sum::<f64>() / marks.len() as f64),
        GradingMethod::First => marks.first().copied(),
        GradingMethod::Last => marks.last().copied(),
    }
}

/// Linear rescale from the raw mark range (0..sum_grades) onto the quiz's
/// display scale (0..grade).
pub fn rescale(raw: f64, sum_grades: f64, grade: f64) -> f64 {
    if sum_grades < GRADE_EPSILON {
        0.0
    } else {
        raw * grade / sum_grades
    }
}

/// Factor for an O(1) proportional regrade, or `None` when the old scale is
/// too close to zero and stored grades must be recomputed from raw sums.
pub fn rescale_factor(old_grade: f64, new_grade: f64) -> Option<f64> {
    if old_grade < GRADE_EPSILON {
        None
    } else {
        Some(new_grade / old_grade)
    }
}

/// Rounding happens only at display time; stored grades keep full precision.
pub fn round_display(value: f64, decimal_points: i32) -> f64 {
    let factor = 10f64.powi(decimal_points.max(0));
    (value * factor).round() / factor
}

/// First boundary whose range contains the grade; rows come ordered by
/// min_grade descending, so a grade sitting exactly on a boundary gets the
/// better feedback.
pub fn feedback_for_grade<'a>(
    boundaries: &'a [FeedbackBoundary],
    grade: f64,
) -> Option<&'a FeedbackBoundary> {
    boundaries
        .iter()
        .find(|boundary| grade >= boundary.min_grade && grade <= boundary.max_grade)
}

/// Recomputes the user's cached grade from their attempt rows and pushes the
/// result to the gradebook. Recompute-then-store: safe to race with itself
/// for the same user since the inputs fully determine the output.
pub async fn recompute_user_grade(
    state: &AppState,
    quiz: &Quiz,
    user_id: &str,
) -> Result<Option<f64>, sqlx::Error> {
    let mut tx = state.db().begin().await?;
    let attempts = repositories::attempts::list_graded(&mut *tx, &quiz.id, user_id).await?;
    let raw = aggregate_raw(quiz.grading_method, &attempts);
    let grade = raw.map(|value| rescale(value, quiz.sum_grades, quiz.grade));

    match grade {
        Some(value) => {
            repositories::grades::upsert(&mut *tx, &quiz.id, user_id, value, unix_now()).await?;
        }
        None => {
            repositories::grades::delete(&mut *tx, &quiz.id, user_id).await?;
        }
    }
    tx.commit().await?;

    gradebook::push_best_effort(state.gradebook(), &quiz.id, user_id, grade).await;

    Ok(grade)
}

/// Full regrade of every user with attempts at this quiz.
pub async fn recompute_all_grades(state: &AppState, quiz: &Quiz) -> Result<u64, sqlx::Error> {
    let users = repositories::attempts::list_users_with_attempts(state.db(), &quiz.id).await?;
    let mut recomputed = 0;
    for user_id in users {
        recompute_user_grade(state, quiz, &user_id).await?;
        recomputed += 1;
    }
    tracing::info!(quiz_id = %quiz.id, recomputed, "Recomputed quiz grades");
    Ok(recomputed)
}

/// Changes the quiz's display grade. When the old scale is non-zero every
/// stored grade and feedback boundary is multiplied by new/old in place;
/// a zero old scale forces a full recompute from raw sums.
pub async fn set_quiz_grade(
    state: &AppState,
    quiz: &Quiz,
    new_grade: f64,
) -> Result<(), sqlx::Error> {
    if (new_grade - quiz.grade).abs() < GRADE_EPSILON {
        return Ok(());
    }

    let now = unix_now();

    match rescale_factor(quiz.grade, new_grade) {
        Some(factor) => {
            let mut tx = state.db().begin().await?;
            repositories::quizzes::update_grade(&mut *tx, &quiz.id, new_grade, primitive_now_utc())
                .await?;
            repositories::grades::scale_all(&mut *tx, &quiz.id, factor, now).await?;
            repositories::grades::scale_boundaries(&mut *tx, &quiz.id, factor).await?;
            tx.commit().await?;

            for row in repositories::grades::list_all(state.db(), &quiz.id).await? {
                gradebook::push_best_effort(
                    state.gradebook(),
                    &quiz.id,
                    &row.user_id,
                    Some(row.grade),
                )
                .await;
            }
        }
        None => {
            repositories::quizzes::update_grade(state.db(), &quiz.id, new_grade, primitive_now_utc())
                .await?;
            let mut updated = quiz.clone();
            updated.grade = new_grade;
            recompute_all_grades(state, &updated).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn graded_attempts(raws: &[f64]) -> Vec<Attempt> {
        raws.iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut attempt = test_support::attempt("q1", "u1", index as i32 + 1);
                attempt.sum_grades = Some(*raw);
                attempt
            })
            .collect()
    }

    #[test]
    fn aggregation_over_known_raw_sums() {
        let attempts = graded_attempts(&[40.0, 70.0, 55.0]);
        let scaled = |method| {
            aggregate_raw(method, &attempts).map(|raw| rescale(raw, 100.0, 20.0)).unwrap()
        };

        assert!((scaled(GradingMethod::Highest) - 14.0).abs() < 1e-9);
        assert!((scaled(GradingMethod::Average) - 11.0).abs() < 1e-9);
        assert!((scaled(GradingMethod::First) - 8.0).abs() < 1e-9);
        assert!((scaled(GradingMethod::Last) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn attempts_without_marks_are_ignored() {
        let mut attempts = graded_attempts(&[30.0]);
        attempts.insert(0, test_support::attempt("q1", "u1", 0));
        assert_eq!(aggregate_raw(GradingMethod::First, &attempts), Some(30.0));
    }

    #[test]
    fn no_eligible_attempts_means_no_grade() {
        assert_eq!(aggregate_raw(GradingMethod::Highest, &[]), None);
        let ungraded = vec![test_support::attempt("q1", "u1", 1)];
        assert_eq!(aggregate_raw(GradingMethod::Highest, &ungraded), None);
    }

    #[test]
    fn rescale_handles_zero_sum_grades() {
        assert_eq!(rescale(50.0, 0.0, 20.0), 0.0);
    }

    #[test]
    fn rescale_round_trip_restores_grades() {
        let original = 14.37;
        let factor_out = rescale_factor(20.0, 80.0).unwrap();
        let factor_back = rescale_factor(80.0, 20.0).unwrap();
        let restored = original * factor_out * factor_back;
        assert!((restored - original).abs() < 1e-9);
    }

    #[test]
    fn zero_old_grade_cannot_rescale_proportionally() {
        assert!(rescale_factor(0.0, 50.0).is_none());
        assert!(rescale_factor(50.0, 0.0).is_some());
    }

    #[test]
    fn display_rounding_only_affects_presentation() {
        assert_eq!(round_display(11.666666, 2), 11.67);
        assert_eq!(round_display(11.666666, 0), 12.0);
    }

    #[test]
    fn feedback_lookup_picks_the_matching_band() {
        let boundary = |min: f64, max: f64, text: &str| FeedbackBoundary {
            id: format!("fb-{min}"),
            quiz_id: "q1".to_string(),
            feedback_text: text.to_string(),
            min_grade: min,
            max_grade: max,
        };
        // Ordered by min_grade descending, as the repository returns them.
        let boundaries =
            vec![boundary(80.0, 100.0, "great"), boundary(50.0, 80.0, "ok"), boundary(0.0, 50.0, "poor")];

        assert_eq!(feedback_for_grade(&boundaries, 90.0).unwrap().feedback_text, "great");
        assert_eq!(feedback_for_grade(&boundaries, 80.0).unwrap().feedback_text, "great");
        assert_eq!(feedback_for_grade(&boundaries, 49.9).unwrap().feedback_text, "poor");
        assert!(feedback_for_grade(&boundaries, 101.0).is_none());
    }
}
