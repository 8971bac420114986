//! Pusher Channels trigger.
//!
//! Each message is published as one event on the recipient's channel,
//! named after `Message::user`, through the signed REST trigger endpoint.

use super::{api_base, http_transport, post, require};
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::transport::{HttpRequest, HttpTransport, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, instrument};

type HmacSha256 = Hmac<Sha256>;

const MAX_CHANNEL_NAME_LEN: usize = 164;

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PusherOptions {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    /// Selects `api-<cluster>.pusher.com`; not needed with `api_url`.
    pub cluster: String,
    /// Event name the web client binds to.
    #[serde(alias = "channel")]
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for PusherOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PusherOptions")
            .field("app_id", &self.app_id)
            .field("key", &self.key)
            .field("cluster", &self.cluster)
            .field("event", &self.event)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// The event payload the web interface renders.
#[derive(Debug, Serialize, PartialEq)]
struct SequenceEvent<'a> {
    sequence: Sequence<'a>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Sequence<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<SequenceMedia<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct SequenceMedia<'a> {
    title: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    media: &'a str,
    #[serde(rename = "type", skip_serializing_if = "str::is_empty")]
    media_type: &'a str,
}

fn sequence(message: &Message) -> SequenceEvent<'_> {
    let images = message
        .media
        .iter()
        .map(|m| SequenceMedia {
            title: m.start_timestamp.to_string(),
            media: &m.url,
            media_type: &m.media_type,
        })
        .collect();
    SequenceEvent {
        sequence: Sequence {
            title: &message.title,
            text: &message.body,
            images,
        },
    }
}

/// Pusher accepts `[A-Za-z0-9_\-=@,.;]` in channel names.
fn is_valid_channel_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_CHANNEL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-=@,.;".contains(c))
}

/// Builds the authenticated query string for a POST of `body` to `path`.
fn signed_query(mac: &HmacSha256, key: &str, path: &str, body: &str, timestamp: i64) -> String {
    let body_md5 = hex::encode(Md5::digest(body.as_bytes()));
    let query = format!(
        "auth_key={}&auth_timestamp={}&auth_version=1.0&body_md5={}",
        key, timestamp, body_md5
    );
    let mut mac = mac.clone();
    mac.update(format!("POST\n{}\n{}", path, query).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{}&auth_signature={}", query, signature)
}

pub struct PusherChannel {
    name: String,
    base: String,
    path: String,
    key: String,
    event: String,
    mac: HmacSha256,
    transport: Arc<dyn HttpTransport>,
}

impl PusherChannel {
    pub fn new(options: PusherOptions) -> Result<Self, ConfigError> {
        let kind = ChannelKind::Pusher;
        require(kind, "app_id", &options.app_id)?;
        require(kind, "key", &options.key)?;
        require(kind, "secret", &options.secret)?;
        require(kind, "event", &options.event)?;
        if !options.app_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "app_id",
                reason: "must be numeric".to_string(),
            });
        }

        let configured = options.api_url.as_deref().filter(|u| !u.is_empty());
        if configured.is_none() {
            require(kind, "cluster", &options.cluster)?;
            if !options
                .cluster
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Err(ConfigError::InvalidValue {
                    channel: kind,
                    field: "cluster",
                    reason: format!("'{}' is not a cluster name", options.cluster),
                });
            }
        }
        let default_base = format!("https://api-{}.pusher.com", options.cluster);
        let base = api_base(kind, configured, &default_base)?;

        let mac = HmacSha256::new_from_slice(options.secret.as_bytes()).map_err(|e| {
            ConfigError::InvalidValue {
                channel: kind,
                field: "secret",
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            name: kind.to_string(),
            base,
            path: format!("/apps/{}/events", options.app_id),
            key: options.key,
            event: options.event,
            mac,
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
impl Channel for PusherChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Pusher
    }

    #[instrument(skip(self, message), fields(channel = %self.name, event = %self.event))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.user.is_empty() {
            return Err(SendError::validation("message has no user to publish to"));
        }
        if !is_valid_channel_name(&message.user) {
            return Err(SendError::validation(format!(
                "'{}' is not a valid Pusher channel name",
                message.user
            )));
        }
        if message.title.is_empty() && message.body.is_empty() {
            return Err(SendError::validation("message title and body are empty"));
        }

        let data = serde_json::to_string(&sequence(message))
            .map_err(|e| SendError::validation(format!("failed to encode event: {}", e)))?;
        let body = json!({
            "name": self.event,
            "channels": [message.user],
            "data": data,
        });
        let encoded = serde_json::to_string(&body)
            .map_err(|e| SendError::validation(format!("failed to encode request: {}", e)))?;
        let query = signed_query(
            &self.mac,
            &self.key,
            &self.path,
            &encoded,
            chrono::Utc::now().timestamp(),
        );

        debug!(pusher_channel = %message.user, "Triggering Pusher event");
        post(
            self.transport.as_ref(),
            ChannelKind::Pusher,
            HttpRequest::json(format!("{}{}?{}", self.base, self.path, query), body),
        )
        .await?;
        info!("Successfully triggered Pusher event.");
        Ok(())
    }
}
