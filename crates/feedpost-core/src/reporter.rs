use std::sync::Arc;

use crate::telegram::MessageSender;

/// Best-effort operator notifications. Without a sender every call is a no-op.
#[derive(Clone, Default)]
pub struct Reporter {
    sender: Option<Arc<dyn MessageSender>>,
}

impl Reporter {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender: Some(sender) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Deliver `message` once. Delivery failures are logged and dropped.
    pub async fn notify(&self, message: &str) {
        let Some(sender) = &self.sender else {
            return;
        };

        if let Err(e) = sender.send(message).await {
            tracing::warn!("Failed to deliver report: {}", e);
        }
    }
}
