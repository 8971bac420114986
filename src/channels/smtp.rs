//! Email over SMTP, optionally rendered from a stored template.

use super::{require, require_email};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::template;
use crate::templates::{TemplateFormat, TemplateStore};
use crate::transport::{MailTransport, SmtpMailer, DEFAULT_SMTP_TIMEOUT};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmtpOptions {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub email_from: String,
    pub email_to: String,
    /// Renders `<template_id>.html` / `<template_id>.txt` instead of the raw body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for SmtpOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpOptions")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("email_from", &self.email_from)
            .field("email_to", &self.email_to)
            .field("template_id", &self.template_id)
            .finish_non_exhaustive()
    }
}

pub struct SmtpChannel {
    name: String,
    from: Mailbox,
    to: Mailbox,
    template_id: Option<String>,
    templates: Arc<dyn TemplateStore>,
    transport: Arc<dyn MailTransport>,
}

impl SmtpChannel {
    pub fn new(
        options: SmtpOptions,
        templates: Arc<dyn TemplateStore>,
    ) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Smtp;
        require(kind, "server", &options.server)?;
        if options.port == 0 {
            return Err(ConfigError::InvalidPort { channel: kind });
        }
        require(kind, "username", &options.username)?;
        require(kind, "password", &options.password)?;
        let from = require_email(kind, "email_from", &options.email_from)?;
        let to = require_email(kind, "email_to", &options.email_to)?;
        if options.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        let timeout = options
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SMTP_TIMEOUT);
        let transport = SmtpMailer::new(
            options.server,
            options.port,
            options.username,
            options.password,
            timeout,
        );

        Ok(Self {
            name: kind.to_string(),
            from,
            to,
            template_id: options.template_id.filter(|id| !id.is_empty()),
            templates,
            transport: Arc::new(transport),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sends one email with the given subject and bodies.
    ///
    /// Empty bodies are dropped; when both are present the email is
    /// `multipart/alternative`.
    #[instrument(skip(self, html, text), fields(channel = %self.name))]
    pub async fn send_email(
        &self,
        subject: &str,
        html: Option<&str>,
        text: Option<&str>,
    ) -> Result<(), SendError> {
        if subject.is_empty() {
            return Err(SendError::validation("email subject is empty"));
        }
        let html = html.filter(|h| !h.is_empty());
        let text = text.filter(|t| !t.is_empty());

        let builder = lettre::Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject);
        let email = match (html, text) {
            (Some(html), Some(text)) => builder.multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            )),
            (Some(html), None) => builder
                .header(ContentType::TEXT_HTML)
                .body(html.to_string()),
            (None, Some(text)) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.to_string()),
            (None, None) => return Err(SendError::validation("email body is empty")),
        }
        .map_err(|e| SendError::validation(format!("failed to build email: {}", e)))?;

        self.transport.deliver(email).await?;
        info!(to = %self.to, "Successfully sent email.");
        Ok(())
    }

    async fn render_bodies(
        &self,
        message: &Message,
    ) -> Result<(Option<String>, Option<String>), SendError> {
        let Some(template_id) = &self.template_id else {
            return Ok((None, Some(message.body.clone())));
        };

        let html = self
            .templates
            .fetch(template_id, TemplateFormat::Html)
            .await?;
        let text = self
            .templates
            .fetch(template_id, TemplateFormat::Text)
            .await?;
        if html.is_none() && text.is_none() {
            return Err(SendError::Template(format!(
                "template '{}' not found",
                template_id
            )));
        }
        debug!(template_id = %template_id, "Rendering email template");
        Ok((
            html.map(|h| template::render(&h, message)),
            text.map(|t| template::render(&t, message)),
        ))
    }
}

#[async_trait]
impl Channel for SmtpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Smtp
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.title.is_empty() {
            return Err(SendError::validation("message title is empty"));
        }
        let (html, text) = self.render_bodies(message).await?;
        self.send_email(&message.title, html.as_deref(), text.as_deref())
            .await
    }
}
