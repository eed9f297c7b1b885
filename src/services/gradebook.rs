use async_trait::async_trait;

/// External gradebook. Pushes are best-effort from the caller's point of
/// view: a failed delivery is logged and counted, never surfaced as a
/// failure of the attempt operation that triggered it.
#[async_trait]
pub trait Gradebook: Send + Sync {
    /// `None` clears the user's grade for this quiz.
    async fn push_grade(
        &self,
        quiz_id: &str,
        user_id: &str,
        grade: Option<f64>,
    ) -> anyhow::Result<()>;

    /// Bulk mode: wipe every grade recorded for this quiz.
    async fn reset_all(&self, quiz_id: &str) -> anyhow::Result<()>;

    async fn delete_grade_item(&self, quiz_id: &str) -> anyhow::Result<()>;
}

/// Default adapter for deployments where the gradebook lives elsewhere.
pub struct LoggingGradebook;

#[async_trait]
impl Gradebook for LoggingGradebook {
    async fn push_grade(
        &self,
        quiz_id: &str,
        user_id: &str,
        grade: Option<f64>,
    ) -> anyhow::Result<()> {
        tracing::info!(quiz_id, user_id, grade = ?grade, "Gradebook push");
        Ok(())
    }

    async fn reset_all(&self, quiz_id: &str) -> anyhow::Result<()> {
        tracing::info!(quiz_id, "Gradebook reset");
        Ok(())
    }

    async fn delete_grade_item(&self, quiz_id: &str) -> anyhow::Result<()> {
        tracing::info!(quiz_id, "Gradebook item deleted");
        Ok(())
    }
}

pub(crate) async fn push_best_effort(
    gradebook: &dyn Gradebook,
    quiz_id: &str,
    user_id: &str,
    grade: Option<f64>,
) {
    if let Err(err) = gradebook.push_grade(quiz_id, user_id, grade).await {
        tracing::error!(quiz_id, user_id, error = %err, "Failed to push grade to gradebook");
        metrics::counter!("gradebook_push_failures_total").increment(1);
    }
}
