//! SMS through the Twilio Messages API.

use super::{api_base, http_transport, post, require};
use crate::core::{text_with_link, Channel, ChannelKind, Message, TextChannel};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_API_URL: &str = "https://api.twilio.com";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmsOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending number, E.164.
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for SmsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsOptions")
            .field("account_sid", &self.account_sid)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

pub struct SmsChannel {
    name: String,
    endpoint: String,
    options: SmsOptions,
    transport: Arc<dyn HttpTransport>,
}

impl SmsChannel {
    pub fn new(options: SmsOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Sms;
        require(kind, "account_sid", &options.account_sid)?;
        require(kind, "auth_token", &options.auth_token)?;
        require(kind, "from", &options.from)?;
        require(kind, "to", &options.to)?;
        let base = api_base(kind, options.api_url.as_deref(), DEFAULT_API_URL)?;

        Ok(Self {
            name: kind.to_string(),
            endpoint: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                base, options.account_sid
            ),
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

    async fn send_sms(&self, body: String) -> Result<(), SendError> {
        let fields = vec![
            ("From".to_string(), self.options.from.clone()),
            ("To".to_string(), self.options.to.clone()),
            ("Body".to_string(), body),
        ];
        let request = HttpRequest::form(self.endpoint.clone(), fields).basic_auth(
            self.options.account_sid.clone(),
            self.options.auth_token.clone(),
        );
        post(self.transport.as_ref(), ChannelKind::Sms, request).await?;
        info!(to = %self.options.to, "Successfully sent SMS.");
        Ok(())
    }
}

#[async_trait]
impl Channel for SmsChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        self.send_sms(text_with_link(&message.body, message.primary_link()))
            .await
    }
}

#[async_trait]
impl TextChannel for SmsChannel {
    #[instrument(skip(self, body), fields(channel = %self.name))]
    async fn send_text(&self, body: &str, url: &str) -> Result<(), SendError> {
        if body.is_empty() {
            return Err(SendError::validation("text body is empty"));
        }
        self.send_sms(text_with_link(body, url)).await
    }
}
