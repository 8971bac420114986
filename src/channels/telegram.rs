//! Telegram Bot API channel.

use super::{api_base, http_transport, post, require};
use crate::core::{text_with_link, Channel, ChannelKind, Message, TextChannel};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelegramOptions {
    /// Bot token.
    pub token: String,
    /// Chat id, `@channel` handle, or a private channel reference (`c<id>_<msg>`).
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl TelegramOptions {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
            api_url: None,
        }
    }
}

/// Resolves the configured channel to a Bot API `chat_id`.
///
/// Private channel references copied from a web link look like
/// `c1234567890_42`; the API wants `-1001234567890`.
pub fn chat_id(channel: &str) -> String {
    match channel.strip_prefix('c') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => {
            let id = rest.split('_').next().unwrap_or(rest);
            format!("-100{}", id)
        }
        _ => channel.to_string(),
    }
}

pub struct TelegramChannel {
    name: String,
    endpoint: String,
    chat_id: String,
    transport: Arc<dyn HttpTransport>,
}

impl TelegramChannel {
    pub fn new(options: TelegramOptions) -> Result<Self, ConfigError> {
        require(ChannelKind::Telegram, "token", &options.token)?;
        require(ChannelKind::Telegram, "channel", &options.channel)?;
        let base = api_base(
            ChannelKind::Telegram,
            options.api_url.as_deref(),
            DEFAULT_API_URL,
        )?;
        Ok(Self {
            name: ChannelKind::Telegram.to_string(),
            endpoint: format!("{}/bot{}/sendMessage", base, options.token),
            chat_id: chat_id(&options.channel),
            transport: http_transport(ChannelKind::Telegram, DEFAULT_HTTP_TIMEOUT)?,
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

    async fn send_message(&self, text: String) -> Result<(), SendError> {
        debug!(chat_id = %self.chat_id, "Sending Telegram message");
        let request = HttpRequest::json(
            self.endpoint.clone(),
            json!({ "chat_id": self.chat_id, "text": text }),
        );
        post(self.transport.as_ref(), ChannelKind::Telegram, request).await?;
        info!("Successfully sent notification to Telegram.");
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        self.send_message(text_with_link(&message.body, message.primary_link()))
            .await
    }
}

#[async_trait]
impl TextChannel for TelegramChannel {
    #[instrument(skip(self, body), fields(channel = %self.name))]
    async fn send_text(&self, body: &str, url: &str) -> Result<(), SendError> {
        if body.is_empty() {
            return Err(SendError::validation("text body is empty"));
        }
        self.send_message(text_with_link(body, url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Media;
    use crate::test_utils::RecordingHttpTransport;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_chat_id_conversion() {
        assert_eq!(chat_id("c1234567890_42"), "-1001234567890");
        assert_eq!(chat_id("c1234567890"), "-1001234567890");
        assert_eq!(chat_id("@alerts"), "@alerts");
        assert_eq!(chat_id("-100987"), "-100987");
        assert_eq!(chat_id("channelname"), "channelname");
    }

    #[tokio::test]
    async fn test_telegram_posts_to_bot_endpoint() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(json!({
                "chat_id": "-1001234",
                "text": "Motion detected\r\nhttps://x/clip.mp4"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let mut options = TelegramOptions::new("TOKEN", "c1234_9");
        options.api_url = Some(server.uri());
        let channel = TelegramChannel::new(options).unwrap();
        let mut message = Message::new("Motion", "Motion detected");
        message.media.push(Media {
            url: "https://x/clip.mp4".into(),
            ..Default::default()
        });

        // Act
        let result = channel.send(&message).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_telegram_unauthorized_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let mut options = TelegramOptions::new("bad", "@alerts");
        options.api_url = Some(server.uri());
        let channel = TelegramChannel::new(options).unwrap();

        let err = channel.send_text("hello", "").await.unwrap_err();
        assert!(matches!(err, SendError::Rejected { status: Some(401), .. }));
    }

    #[tokio::test]
    async fn test_telegram_unreachable_api_keeps_token_out_of_error() {
        let mut options = TelegramOptions::new("BOTSECRET123", "@alerts");
        options.api_url = Some("http://127.0.0.1:1".into());
        let channel = TelegramChannel::new(options).unwrap();

        let err = channel.send_text("hello", "").await.unwrap_err();

        assert!(matches!(err, SendError::Transport { .. }));
        assert!(!err.to_string().contains("BOTSECRET123"), "leaked: {}", err);
    }

    #[tokio::test]
    async fn test_telegram_empty_body_is_validation_error() {
        let transport = Arc::new(RecordingHttpTransport::new());
        let channel = TelegramChannel::new(TelegramOptions::new("t", "@alerts"))
            .unwrap()
            .with_transport(transport.clone());

        assert!(channel
            .send(&Message::new("x", ""))
            .await
            .unwrap_err()
            .is_validation());
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_telegram_options_validation() {
        assert!(matches!(
            TelegramChannel::new(TelegramOptions::new("", "@a")),
            Err(ConfigError::MissingField { field: "token", .. })
        ));
        assert!(matches!(
            TelegramChannel::new(TelegramOptions::new("t", "")),
            Err(ConfigError::MissingField { field: "channel", .. })
        ));
    }
}
