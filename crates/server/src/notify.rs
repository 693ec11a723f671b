// crates/server/src/notify.rs
//! Delivery of free-text "message" updates to a task owner.
//!
//! Messages bypass the progress store entirely. The server only resolves
//! the owner from the caller's secret and hands the text to a [`Notifier`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook answered {0}")]
    Rejected(StatusCode),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: &str, message: &str) -> Result<(), NotifyError>;
}

/// Text delivered to the owner.
pub fn format_message(owner: &str, message: &str) -> String {
    format!("Ahoy @{owner}! New message:\n> {message}")
}

/// Writes messages to the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, owner: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(owner = %owner, message = %message, "Message received");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    owner: &'a str,
    text: String,
}

/// POSTs `{"owner": ..., "text": ...}` to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, owner: &str, message: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            owner,
            text: format_message(owner, message),
        };
        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status));
        }
        tracing::debug!(owner = %owner, "Message forwarded to webhook");
        Ok(())
    }
}
