//! A channel for posting notifications to a Slack incoming webhook.

use super::{http_transport, post, require, require_url};
use crate::core::{text_with_link, Channel, ChannelKind, Message, TextChannel};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SlackOptions {
    /// Incoming webhook URL.
    pub hook: String,
    /// Display name the bot posts as.
    pub username: String,
}

impl SlackOptions {
    pub fn new(hook: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            username: username.into(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_url(ChannelKind::Slack, "hook", &self.hook)?;
        require(ChannelKind::Slack, "username", &self.username)
    }
}

/// Posts `{username, text, attachments}` to the webhook.
pub struct SlackChannel {
    name: String,
    options: SlackOptions,
    transport: Arc<dyn HttpTransport>,
}

impl SlackChannel {
    pub fn new(options: SlackOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            name: ChannelKind::Slack.to_string(),
            options,
            transport: http_transport(ChannelKind::Slack, DEFAULT_HTTP_TIMEOUT)?,
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

    fn payload(&self, text: &str, image_url: &str) -> Value {
        let mut payload = json!({
            "username": self.options.username,
            "text": text,
        });
        if !image_url.is_empty() {
            payload["attachments"] = json!([{ "color": "good", "image_url": image_url }]);
        }
        payload
    }

    async fn post_text(&self, text: String, image_url: &str) -> Result<(), SendError> {
        let request = HttpRequest::json(self.options.hook.clone(), self.payload(&text, image_url));
        post(self.transport.as_ref(), ChannelKind::Slack, request).await?;
        info!("Successfully sent notification to Slack.");
        Ok(())
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        let link = message.primary_link();
        // Slack cannot render inline base64, so the preview comes from the media.
        let image = message
            .primary_media()
            .map(|m| m.thumbnail_url.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(link);
        self.post_text(text_with_link(&message.body, link), image)
            .await
    }
}

#[async_trait]
impl TextChannel for SlackChannel {
    #[instrument(skip(self, body), fields(channel = %self.name))]
    async fn send_text(&self, body: &str, url: &str) -> Result<(), SendError> {
        if body.is_empty() {
            return Err(SendError::validation("text body is empty"));
        }
        self.post_text(text_with_link(body, url), url).await
    }
}
