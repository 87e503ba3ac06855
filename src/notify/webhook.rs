use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::notify::{NewNotification, NotificationSink, NotifyError};

/// Pushes each notification as a JSON POST to an external endpoint.
#[derive(Clone, Debug)]
pub struct WebhookSink {
    url: String,
    http_client: Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let http_client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn create_notification(&self, notification: &NewNotification) -> Result<(), NotifyError> {
        self.http_client
            .post(&self.url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "Notification pushed to webhook"
        );
        Ok(())
    }
}
