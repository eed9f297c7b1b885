use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;

/// How question variants are picked when a usage starts.
#[derive(Debug, Clone, Copy)]
pub enum VariantStrategy {
    Random,
    Fixed(i32),
}

/// The external question engine. The attempt lifecycle owns usage handles
/// and drives them through this seam; rendering and response processing
/// happen entirely on the other side of it.
#[async_trait]
pub trait QuestionEngine: Send + Sync {
    async fn start_usage(&self, quiz_id: &str, user_id: &str) -> anyhow::Result<String>;

    async fn add_question(
        &self,
        usage_id: &str,
        question_id: &str,
        max_mark: f64,
    ) -> anyhow::Result<i32>;

    async fn start_all_questions(
        &self,
        usage_id: &str,
        variants: VariantStrategy,
        now: i64,
        user_id: &str,
    ) -> anyhow::Result<()>;

    /// Finalize every question in the usage, grading unanswered ones as
    /// submitted-empty. Must be idempotent.
    async fn finish_all(&self, usage_id: &str, now: i64) -> anyhow::Result<()>;

    async fn total_mark(&self, usage_id: &str) -> anyhow::Result<Option<f64>>;

    async fn delete_usage(&self, usage_id: &str) -> anyhow::Result<()>;

    async fn clone_question_state(
        &self,
        usage_id: &str,
        from_usage_id: &str,
        slot: i32,
    ) -> anyhow::Result<()>;
}

/// Reference engine adapter backed by the crate's own database, so the
/// worker binary and integration tests run without the real engine. A web
/// deployment substitutes its own implementation.
#[derive(Clone)]
pub struct PgQuestionEngine {
    pool: PgPool,
}

impl PgQuestionEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a mark for one slot. Not part of the engine seam: response
    /// processing normally happens on the engine's side, this is the hook
    /// the reference adapter exposes instead.
    pub async fn record_mark(&self, usage_id: &str, slot: i32, mark: f64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE question_usage_slots SET mark = $1 \
             WHERE usage_id = $2 AND slot = $3 AND finished = FALSE",
        )
        .bind(mark)
        .bind(usage_id)
        .bind(slot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl QuestionEngine for PgQuestionEngine {
    async fn start_usage(&self, quiz_id: &str, user_id: &str) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO question_usages (id, quiz_id, user_id, created_at) VALUES ($1,$2,$3,$4)",
        )
        .bind(&id)
        .bind(quiz_id)
        .bind(user_id)
        .bind(primitive_now_utc())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn add_question(
        &self,
        usage_id: &str,
        question_id: &str,
        max_mark: f64,
    ) -> anyhow::Result<i32> {
        let slot: i32 = sqlx::query_scalar(
            "INSERT INTO question_usage_slots (usage_id, slot, question_id, max_mark) \
             SELECT $1, COALESCE(MAX(slot), 0) + 1, $2, $3 \
             FROM question_usage_slots WHERE usage_id = $1 \
             RETURNING slot",
        )
        .bind(usage_id)
        .bind(question_id)
        .bind(max_mark)
        .fetch_one(&self.pool)
        .await?;
        Ok(slot)
    }

    async fn start_all_questions(
        &self,
        usage_id: &str,
        _variants: VariantStrategy,
        _now: i64,
        _user_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE question_usage_slots SET started = TRUE WHERE usage_id = $1")
            .bind(usage_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn finish_all(&self, usage_id: &str, _now: i64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE question_usage_slots SET mark = COALESCE(mark, 0), finished = TRUE \
             WHERE usage_id = $1 AND finished = FALSE",
        )
        .bind(usage_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE question_usages SET finished = TRUE WHERE id = $1")
            .bind(usage_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn total_mark(&self, usage_id: &str) -> anyhow::Result<Option<f64>> {
        let total: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(mark) FROM question_usage_slots WHERE usage_id = $1",
        )
        .bind(usage_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn delete_usage(&self, usage_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM question_usages WHERE id = $1")
            .bind(usage_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clone_question_state(
        &self,
        usage_id: &str,
        from_usage_id: &str,
        slot: i32,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO question_usage_slots \
                 (usage_id, slot, question_id, max_mark, mark, started, finished) \
             SELECT $1, slot, question_id, max_mark, mark, started, FALSE \
             FROM question_usage_slots WHERE usage_id = $2 AND slot = $3",
        )
        .bind(usage_id)
        .bind(from_usage_id)
        .bind(slot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
