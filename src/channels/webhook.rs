//! Generic JSON webhook.

use super::{http_transport, post, require_url};
use crate::core::{text_with_link, Channel, ChannelKind, Message, TextChannel};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebhookOptions {
    pub url: String,
    /// Request timeout; defaults to five seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl WebhookOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_url(ChannelKind::Webhook, "url", &self.url)?;
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                channel: ChannelKind::Webhook,
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Posts the whole message as JSON, or a bare JSON string for text sends.
pub struct WebhookChannel {
    name: String,
    url: String,
    transport: Arc<dyn HttpTransport>,
}

impl WebhookChannel {
    pub fn new(options: WebhookOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            name: ChannelKind::Webhook.to_string(),
            transport: http_transport(ChannelKind::Webhook, options.timeout())?,
            url: options.url,
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn post_json(&self, body: Value) -> Result<(), SendError> {
        post(
            self.transport.as_ref(),
            ChannelKind::Webhook,
            HttpRequest::json(self.url.clone(), body),
        )
        .await?;
        info!(url = %self.url, "Successfully sent notification to webhook.");
        Ok(())
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        let body = serde_json::to_value(message)
            .map_err(|e| SendError::validation(format!("failed to encode message: {}", e)))?;
        self.post_json(body).await
    }
}

#[async_trait]
impl TextChannel for WebhookChannel {
    #[instrument(skip(self, body), fields(channel = %self.name))]
    async fn send_text(&self, body: &str, url: &str) -> Result<(), SendError> {
        if body.is_empty() {
            return Err(SendError::validation("text body is empty"));
        }
        self.post_json(Value::String(text_with_link(body, url)))
            .await
    }
}
