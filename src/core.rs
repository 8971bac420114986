//! Core domain types and channel traits for notifyhub
//!
//! This module defines the event record handed to every channel and the
//! capability traits that every delivery backend implements.

use crate::error::SendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An event to be fanned out to notification channels.
///
/// A `Message` is built once per event and then only read: every channel gets
/// the same value by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    /// Event kind, e.g. "message" or "alert".
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub user: String,
    pub user_id: String,
    /// Fallback recipient when a channel has no recipient of its own.
    pub email: String,
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: i64,
    pub media: Vec<Media>,
    /// Free-form template variables, each available as `{{key}}`.
    pub data: HashMap<String, String>,
    pub classifications: Vec<String>,
    pub sites: Vec<NamedEntity>,
    pub groups: Vec<NamedEntity>,
    /// IANA zone name used when rendering dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Inline base64 image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_media: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl Message {
    /// Creates a message with a title and body; everything else is empty.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: "message".to_string(),
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// The representative attachment, if the message carries any media.
    pub fn primary_media(&self) -> Option<&Media> {
        self.media.first()
    }

    /// URL of the representative attachment, or an empty string.
    pub fn primary_link(&self) -> &str {
        self.primary_media().map(|m| m.url.as_str()).unwrap_or_default()
    }

    /// Looks up a caller-supplied template variable, treating empty values as absent.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// An image or video attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    pub url: String,
    pub thumbnail_url: String,
    /// Recording start in seconds since the Unix epoch.
    pub start_timestamp: i64,
    /// "video" or "image".
    #[serde(rename = "type")]
    pub media_type: String,
}

/// A site or group the originating device belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NamedEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl NamedEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// The static set of delivery backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Slack,
    Telegram,
    Webhook,
    Smtp,
    Mail,
    Sms,
    Pushbullet,
    Pushover,
    Ifttt,
    Pusher,
    Mqtt,
    Store,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack",
            ChannelKind::Telegram => "telegram",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Smtp => "smtp",
            ChannelKind::Mail => "mail",
            ChannelKind::Sms => "sms",
            ChannelKind::Pushbullet => "pushbullet",
            ChannelKind::Pushover => "pushover",
            ChannelKind::Ifttt => "ifttt",
            ChannelKind::Pusher => "pusher",
            ChannelKind::Mqtt => "mqtt",
            ChannelKind::Store => "store",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Channel Traits
// =============================================================================

/// A delivery backend that accepts a structured message.
#[async_trait]
pub trait Channel: Send + Sync {
    /// A unique, descriptive name for this channel instance (e.g., "ops-slack").
    /// Used for logging, metrics and dispatch outcomes.
    fn name(&self) -> &str;

    /// The backend this channel talks to.
    fn kind(&self) -> ChannelKind;

    /// Delivers a message through the backend.
    ///
    /// # Returns
    /// * `Ok(())` once the backend acknowledged the notification
    /// * `Err(SendError)` for validation, transport or backend failures
    async fn send(&self, message: &Message) -> Result<(), SendError>;
}

/// A delivery backend that accepts text the caller already rendered.
#[async_trait]
pub trait TextChannel: Send + Sync {
    /// Sends `body`, with `url` appended as a link when it is non-empty.
    async fn send_text(&self, body: &str, url: &str) -> Result<(), SendError>;
}

impl fmt::Debug for dyn Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Joins a body and an optional link the way chat backends display them.
pub fn text_with_link(body: &str, url: &str) -> String {
    if url.is_empty() {
        body.to_string()
    } else {
        format!("{}\r\n{}", body, url)
    }
}
