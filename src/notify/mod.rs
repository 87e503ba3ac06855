//! Notification side effects.
//!
//! Booking flows hand a batch of [`NewNotification`]s to a [`Notifier`],
//! which delivers them on a spawned task. Delivery failures are logged and
//! never reach the caller.

pub mod db;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use crate::entities::notification::{NotificationKind, Priority};
pub use db::DbNotificationSink;
pub use webhook::WebhookSink;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub metadata: Value,
}

impl NewNotification {
    /// Title and message are clipped to the column limits.
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: clip(title.into(), MAX_TITLE_LEN),
            message: clip(message.into(), MAX_MESSAGE_LEN),
            priority: Priority::Medium,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

fn clip(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(&self, notification: &NewNotification) -> Result<(), NotifyError>;
}

/// Delivers to every inner sink in order. All sinks are attempted; the
/// first failure is reported.
pub struct FanOutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanOutSink {
    async fn create_notification(&self, notification: &NewNotification) -> Result<(), NotifyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.create_notification(notification).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Fire-and-forget front for a [`NotificationSink`].
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Spawn delivery of `batch`. The returned handle is only useful to
    /// tests; request paths drop it.
    pub fn dispatch(&self, batch: Vec<NewNotification>) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            for notification in &batch {
                if let Err(e) = sink.create_notification(notification).await {
                    tracing::warn!(
                        user_id = %notification.user_id,
                        kind = ?notification.kind,
                        error = %e,
                        "Failed to deliver notification"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_respects_char_boundaries() {
        let long = "é".repeat(MAX_TITLE_LEN + 5);
        let n = NewNotification::new(Uuid::new_v4(), NotificationKind::System, long, "hi");
        assert_eq!(n.title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(n.message, "hi");
        assert_eq!(n.priority, Priority::Medium);
    }

    #[test]
    fn test_builder_sets_priority_and_metadata() {
        let n = NewNotification::new(Uuid::new_v4(), NotificationKind::RideCancelled, "t", "m")
            .priority(Priority::High)
            .metadata(serde_json::json!({ "refund_amount": 200.0 }));
        assert_eq!(n.priority, Priority::High);
        assert_eq!(n.metadata["refund_amount"], 200.0);
    }
}
