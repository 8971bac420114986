//! Pushbullet pushes.

use super::{api_base, http_transport, post, require};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_API_URL: &str = "https://api.pushbullet.com";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PushbulletOptions {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for PushbulletOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushbulletOptions")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Pushes to every device on the account. A push without a device target
/// is delivered to all of them, so one request covers the fan-out.
pub struct PushbulletChannel {
    name: String,
    endpoint: String,
    api_key: String,
    transport: Arc<dyn HttpTransport>,
}

impl PushbulletChannel {
    pub fn new(options: PushbulletOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Pushbullet;
        require(kind, "api_key", &options.api_key)?;
        let base = api_base(kind, options.api_url.as_deref(), DEFAULT_API_URL)?;
        Ok(Self {
            name: kind.to_string(),
            endpoint: format!("{}/v2/pushes", base),
            api_key: options.api_key,
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
impl Channel for PushbulletChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Pushbullet
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.title.is_empty() && message.body.is_empty() {
            return Err(SendError::validation("message title and body are empty"));
        }
        let link = message.primary_link();
        let push = if link.is_empty() {
            json!({ "type": "note", "title": message.title, "body": message.body })
        } else {
            json!({ "type": "link", "title": message.title, "body": message.body, "url": link })
        };

        let request =
            HttpRequest::json(self.endpoint.clone(), push).header("Access-Token", self.api_key.clone());
        post(self.transport.as_ref(), ChannelKind::Pushbullet, request).await?;
        info!("Successfully sent push to Pushbullet.");
        Ok(())
    }
}
