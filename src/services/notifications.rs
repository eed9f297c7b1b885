use async_trait::async_trait;

pub const TEMPLATE_SUBMISSION_CONFIRMATION: &str = "submission_confirmation";
pub const TEMPLATE_SUBMISSION_NOTICE: &str = "submission_notice";

/// Fire-and-forget message delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        context: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        _context: &serde_json::Value,
    ) -> anyhow::Result<()> {
        tracing::info!(template, recipient, "Notification sent");
        Ok(())
    }
}

/// Delivery failures are operational noise, never an error of the flow that
/// triggered the message.
pub(crate) async fn send_best_effort(
    notifier: &dyn Notifier,
    template: &str,
    recipient: &str,
    context: &serde_json::Value,
) {
    if let Err(err) = notifier.send(template, recipient, context).await {
        tracing::error!(template, recipient, error = %err, "Failed to deliver notification");
        metrics::counter!("notification_failures_total").increment(1);
    }
}
