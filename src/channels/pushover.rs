//! Pushover messages.

use super::{api_base, http_transport, post, require};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_API_URL: &str = "https://api.pushover.net";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PushoverOptions {
    /// Application token.
    pub api_key: String,
    /// User or group key.
    pub send_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for PushoverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverOptions")
            .field("send_to", &self.send_to)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

pub struct PushoverChannel {
    name: String,
    endpoint: String,
    options: PushoverOptions,
    transport: Arc<dyn HttpTransport>,
}

impl PushoverChannel {
    pub fn new(options: PushoverOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Pushover;
        require(kind, "api_key", &options.api_key)?;
        require(kind, "send_to", &options.send_to)?;
        let base = api_base(kind, options.api_url.as_deref(), DEFAULT_API_URL)?;
        Ok(Self {
            name: kind.to_string(),
            endpoint: format!("{}/1/messages.json", base),
            options,
            transport: http_transport(kind, DEFAULT_HTTP_TIMEOUT)?,
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
}

#[async_trait]
impl Channel for PushoverChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Pushover
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        let text = if message.title.is_empty() {
            message.body.clone()
        } else {
            format!("{} {}", message.title, message.body)
        };

        let mut fields = vec![
            ("token".to_string(), self.options.api_key.clone()),
            ("user".to_string(), self.options.send_to.clone()),
            ("message".to_string(), text),
        ];
        let link = message.primary_link();
        if !link.is_empty() {
            fields.push(("url".to_string(), link.to_string()));
        }

        post(
            self.transport.as_ref(),
            ChannelKind::Pushover,
            HttpRequest::form(self.endpoint.clone(), fields),
        )
        .await?;
        info!("Successfully sent message to Pushover.");
        Ok(())
    }
}
