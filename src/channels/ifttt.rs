//! IFTTT Webhooks (Maker) triggers.
//!
//! The message kind names the event; title, body and timestamp travel as
//! `value1`..`value3`.

use super::{api_base, http_transport, post, require};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_API_URL: &str = "https://maker.ifttt.com";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IftttOptions {
    /// Webhooks service key.
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for IftttOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IftttOptions")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

pub struct IftttChannel {
    name: String,
    base: String,
    token: String,
    transport: Arc<dyn HttpTransport>,
}

impl IftttChannel {
    pub fn new(options: IftttOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Ifttt;
        require(kind, "token", &options.token)?;
        Ok(Self {
            name: kind.to_string(),
            base: api_base(kind, options.api_url.as_deref(), DEFAULT_API_URL)?,
            token: options.token,
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

fn is_valid_event(event: &str) -> bool {
    !event.is_empty()
        && event
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl Channel for IftttChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Ifttt
    }

    #[instrument(skip(self, message), fields(channel = %self.name, event = %message.kind))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.kind.is_empty() {
            return Err(SendError::validation("message kind is empty, no event to trigger"));
        }
        if !is_valid_event(&message.kind) {
            return Err(SendError::validation(format!(
                "'{}' is not a valid event name",
                message.kind
            )));
        }

        let url = format!(
            "{}/trigger/{}/with/key/{}",
            self.base, message.kind, self.token
        );
        let values = json!({
            "value1": message.title,
            "value2": message.body,
            "value3": message.timestamp.to_string(),
        });
        post(
            self.transport.as_ref(),
            ChannelKind::Ifttt,
            HttpRequest::json(url, values),
        )
        .await?;
        info!("Successfully triggered IFTTT event.");
        Ok(())
    }
}
