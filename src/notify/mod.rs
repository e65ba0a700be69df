// Outbound operator notifications
use async_trait::async_trait;

use crate::error::NotifyError;

/// Best-effort text channel to the operator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only
///
/// Used when no chat channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(notification = %text, "Notification");
        Ok(())
    }
}

/// Send and swallow any failure
///
/// Notification errors never reach trading logic.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text).await {
        tracing::warn!(error = %e, "Failed to deliver notification");
    }
}
