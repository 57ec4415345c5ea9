//! Notification adapters.

use async_trait::async_trait;
use tokio::sync::RwLock;

use afflictor_domain::AfflictionNotice;

use crate::infrastructure::ports::NotificationPort;

/// Writes every notice to the log.
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn log_notice(notice: &AfflictionNotice) {
    let event = notice.event.event_type();
    if notice.event.is_warning() {
        tracing::warn!(
            target_id = %notice.target_id,
            instance_id = %notice.instance_id,
            affliction = %notice.affliction,
            event,
            detail = ?notice.event,
            "Affliction warning"
        );
    } else {
        tracing::info!(
            target_id = %notice.target_id,
            instance_id = %notice.instance_id,
            affliction = %notice.affliction,
            event,
            detail = ?notice.event,
            "Affliction update"
        );
    }
}

#[async_trait]
impl NotificationPort for TracingNotifier {
    async fn notify(&self, notice: AfflictionNotice) {
        log_notice(&notice);
    }
}

/// Logs and keeps every notice, for inspection by callers.
pub struct RecordingNotifier {
    notices: RwLock<Vec<AfflictionNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            notices: RwLock::new(Vec::new()),
        }
    }

    pub async fn notices(&self) -> Vec<AfflictionNotice> {
        self.notices.read().await.clone()
    }

    /// Event type names in emission order.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.notices
            .read()
            .await
            .iter()
            .map(|n| n.event.event_type())
            .collect()
    }

    pub async fn clear(&self) {
        self.notices.write().await.clear();
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, notice: AfflictionNotice) {
        log_notice(&notice);
        self.notices.write().await.push(notice);
    }
}
