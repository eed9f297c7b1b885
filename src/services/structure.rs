use anyhow::{Context, Result};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Quiz;
use crate::db::types::OverdueHandling;
use crate::repositories;
use crate::services::attempts;

/// New slot definition: a fixed question or a random selector.
pub enum SlotContent {
    Question(String),
    Random { category_id: String, tags: Vec<String> },
}

/// Settings-level sanity checks applied when a quiz is saved.
pub fn validate_settings(quiz: &Quiz) -> Result<(), String> {
    if quiz.overdue_handling == OverdueHandling::Graceperiod
        && quiz.grace_period < quiz.grace_period_min
    {
        return Err(format!(
            "grace period must be at least {} seconds",
            quiz.grace_period_min
        ));
    }
    if quiz.delay_attempt1 < 0 || quiz.delay_attempt2 < 0 {
        return Err("delays between attempts cannot be negative".to_string());
    }
    if quiz.grade < 0.0 {
        return Err("maximum grade cannot be negative".to_string());
    }
    Ok(())
}

/// Appends a slot and restores the sum-of-marks invariant in the same
/// transaction. Preview attempts are discarded afterwards, as on every
/// structure edit.
pub async fn add_slot(
    state: &AppState,
    quiz: &Quiz,
    content: SlotContent,
    max_mark: f64,
) -> Result<i32> {
    let mut tx = state.db().begin().await.context("Failed to start transaction")?;

    let slot_number: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(slot), 0) + 1 FROM quiz_slots WHERE quiz_id = $1",
    )
    .bind(&quiz.id)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to compute slot number")?;

    let (question_id, random_category_id, random_tags) = match &content {
        SlotContent::Question(question_id) => (Some(question_id.as_str()), None, Vec::new()),
        SlotContent::Random { category_id, tags } => {
            (None, Some(category_id.as_str()), tags.clone())
        }
    };

    repositories::slots::create_slot(
        &mut *tx,
        repositories::slots::CreateSlot {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz.id,
            slot: slot_number,
            max_mark,
            question_id,
            random_category_id,
            random_tags,
        },
    )
    .await
    .context("Failed to create slot")?;

    refresh_sum_grades(&mut tx, &quiz.id).await?;
    tx.commit().await.context("Failed to commit slot addition")?;

    purge_previews(state, quiz).await?;
    Ok(slot_number)
}

pub async fn remove_slot(state: &AppState, quiz: &Quiz, slot: i32) -> Result<bool> {
    let mut tx = state.db().begin().await.context("Failed to start transaction")?;
    let removed = repositories::slots::delete_slot(&mut *tx, &quiz.id, slot)
        .await
        .context("Failed to delete slot")?;
    if removed {
        refresh_sum_grades(&mut tx, &quiz.id).await?;
    }
    tx.commit().await.context("Failed to commit slot removal")?;

    if removed {
        purge_previews(state, quiz).await?;
    }
    Ok(removed)
}

pub async fn set_slot_max_mark(
    state: &AppState,
    quiz: &Quiz,
    slot: i32,
    max_mark: f64,
) -> Result<bool> {
    let mut tx = state.db().begin().await.context("Failed to start transaction")?;
    let updated = repositories::slots::update_max_mark(&mut *tx, &quiz.id, slot, max_mark)
        .await
        .context("Failed to update slot mark")?;
    if updated {
        refresh_sum_grades(&mut tx, &quiz.id).await?;
    }
    tx.commit().await.context("Failed to commit mark change")?;

    if updated {
        purge_previews(state, quiz).await?;
    }
    Ok(updated)
}

async fn refresh_sum_grades(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    quiz_id: &str,
) -> Result<()> {
    let sum = repositories::slots::sum_max_marks(&mut **tx, quiz_id)
        .await
        .context("Failed to sum slot marks")?;
    repositories::quizzes::update_sum_grades(&mut **tx, quiz_id, sum, primitive_now_utc())
        .await
        .context("Failed to update quiz sum_grades")?;
    Ok(())
}

/// Preview attempts never survive a structure change.
pub async fn purge_previews(state: &AppState, quiz: &Quiz) -> Result<u64> {
    let previews = repositories::attempts::list_previews(state.db(), &quiz.id)
        .await
        .context("Failed to list preview attempts")?;

    let mut deleted = 0;
    for preview in previews {
        attempts::delete_attempt(state, &preview.id)
            .await
            .with_context(|| format!("Failed to delete preview attempt {}", preview.id))?;
        deleted += 1;
    }
    if deleted > 0 {
        tracing::info!(quiz_id = %quiz.id, deleted, "Purged preview attempts");
    }
    Ok(deleted)
}

/// Replaces the feedback boundary table for a quiz. Boundaries must be
/// well-formed ranges; overlap checks are the caller's concern.
pub async fn set_feedback_boundaries(
    state: &AppState,
    quiz_id: &str,
    boundaries: &[(String, f64, f64)],
) -> Result<()> {
    for (_, min_grade, max_grade) in boundaries {
        if min_grade >= max_grade {
            anyhow::bail!("feedback boundary range [{min_grade}, {max_grade}) is empty");
        }
    }

    let mut tx = state.db().begin().await.context("Failed to start transaction")?;
    sqlx::query("DELETE FROM quiz_feedback WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear feedback boundaries")?;
    for (text, min_grade, max_grade) in boundaries {
        repositories::grades::create_boundary(
            &mut *tx,
            &Uuid::new_v4().to_string(),
            quiz_id,
            text,
            *min_grade,
            *max_grade,
        )
        .await
        .context("Failed to insert feedback boundary")?;
    }
    tx.commit().await.context("Failed to commit feedback boundaries")?;
    Ok(())
}

/// Course-reset support: removes every attempt and cached grade for the
/// quiz and clears the external gradebook in bulk.
pub async fn reset_attempt_data(state: &AppState, quiz: &Quiz) -> Result<(u64, u64)> {
    release_all_usages(state, &quiz.id).await?;

    let attempts_deleted = sqlx::query("DELETE FROM attempts WHERE quiz_id = $1")
        .bind(&quiz.id)
        .execute(state.db())
        .await
        .context("Failed to delete attempts")?
        .rows_affected();
    let grades_deleted = repositories::grades::delete_all(state.db(), &quiz.id)
        .await
        .context("Failed to delete cached grades")?;

    if let Err(err) = state.gradebook().reset_all(&quiz.id).await {
        tracing::error!(quiz_id = %quiz.id, error = %err, "Failed to reset gradebook grades");
    }

    tracing::info!(
        quiz_id = %quiz.id,
        attempts_deleted,
        grades_deleted,
        "Reset quiz attempt data"
    );
    Ok((attempts_deleted, grades_deleted))
}

async fn release_all_usages(state: &AppState, quiz_id: &str) -> Result<()> {
    let usage_ids: Vec<String> =
        sqlx::query_scalar("SELECT usage_id FROM attempts WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_all(state.db())
            .await
            .context("Failed to list attempt usages")?;

    for usage_id in usage_ids {
        if let Err(err) = state.question_engine().delete_usage(&usage_id).await {
            tracing::error!(usage_id, error = %err, "Failed to release question usage");
        }
    }
    Ok(())
}

/// Deletes a quiz: releases every attempt's question usage, lets the row
/// cascade take the relational data, and drops the gradebook item.
pub async fn delete_quiz(state: &AppState, quiz: &Quiz) -> Result<()> {
    release_all_usages(state, &quiz.id).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(&quiz.id)
        .execute(state.db())
        .await
        .context("Failed to delete quiz")?;

    if let Err(err) = state.gradebook().delete_grade_item(&quiz.id).await {
        tracing::error!(quiz_id = %quiz.id, error = %err, "Failed to delete gradebook item");
    }

    Ok(())
}
