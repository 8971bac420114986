//! Transactional email through the Mailgun HTTP API.
//!
//! The message body is not sent as text. Mailgun renders a stored template
//! and the message fields travel as template variables.

use super::{api_base, http_transport, post, require, require_email};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::template;
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_API_URL: &str = "https://api.mailgun.net";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailOptions {
    pub domain: String,
    pub api_key: String,
    pub template_id: String,
    pub email_from: String,
    /// Fixed recipient; falls back to `Message::email` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for MailOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailOptions")
            .field("domain", &self.domain)
            .field("template_id", &self.template_id)
            .field("email_from", &self.email_from)
            .field("email_to", &self.email_to)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

pub struct MailChannel {
    name: String,
    endpoint: String,
    api_key: String,
    template_id: String,
    from: Mailbox,
    to: Option<Mailbox>,
    transport: Arc<dyn HttpTransport>,
}

impl MailChannel {
    pub fn new(options: MailOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Mail;
        require(kind, "domain", &options.domain)?;
        if !is_valid_domain(&options.domain) {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "domain",
                reason: format!("'{}' is not a sending domain", options.domain),
            });
        }
        require(kind, "api_key", &options.api_key)?;
        require(kind, "template_id", &options.template_id)?;
        let from = require_email(kind, "email_from", &options.email_from)?;
        let to = match options.email_to.as_deref().filter(|t| !t.is_empty()) {
            Some(to) => Some(require_email(kind, "email_to", to)?),
            None => None,
        };
        let base = api_base(kind, options.api_url.as_deref(), DEFAULT_API_URL)?;

        Ok(Self {
            name: kind.to_string(),
            endpoint: format!("{}/v3/{}/messages", base, options.domain),
            api_key: options.api_key,
            template_id: options.template_id,
            from,
            to,
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

    fn recipient(&self, message: &Message) -> Result<Mailbox, SendError> {
        if let Some(to) = &self.to {
            return Ok(to.clone());
        }
        if message.email.is_empty() {
            return Err(SendError::validation("no recipient email address"));
        }
        message
            .email
            .parse()
            .map_err(|_| SendError::validation(format!("invalid recipient '{}'", message.email)))
    }
}

/// The domain is interpolated into the request path.
fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

#[async_trait]
impl Channel for MailChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Mail
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.title.is_empty() {
            return Err(SendError::validation("message title is empty"));
        }
        let to = self.recipient(message)?;
        let variables = serde_json::to_string(&template::variables(message))
            .map_err(|e| SendError::validation(format!("failed to encode variables: {}", e)))?;

        let fields = vec![
            ("from".to_string(), self.from.to_string()),
            ("to".to_string(), to.to_string()),
            ("subject".to_string(), message.title.clone()),
            ("template".to_string(), self.template_id.clone()),
            ("h:X-Mailgun-Variables".to_string(), variables),
        ];
        let request =
            HttpRequest::form(self.endpoint.clone(), fields).basic_auth("api", self.api_key.clone());
        post(self.transport.as_ref(), ChannelKind::Mail, request).await?;
        info!(to = %to, "Successfully queued email with Mailgun.");
        Ok(())
    }
}
