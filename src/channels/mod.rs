//! Delivery backends.
//!
//! Each submodule holds one canonical channel: an options struct (which is
//! also its configuration schema), validated once at construction, and a
//! channel type implementing [`Channel`] over an injectable transport.
//!
//! The set of backends is closed: [`ChannelSettings`] lists every kind and
//! [`build`] is the only way configuration turns into channels.

pub mod ifttt;
pub mod mail;
pub mod mqtt;
pub mod pushbullet;
pub mod pushover;
pub mod pusher;
pub mod slack;
pub mod sms;
pub mod smtp;
pub mod store;
pub mod telegram;
pub mod webhook;

pub use ifttt::{IftttChannel, IftttOptions};
pub use mail::{MailChannel, MailOptions};
pub use mqtt::{MqttChannel, MqttOptions};
pub use pushbullet::{PushbulletChannel, PushbulletOptions};
pub use pushover::{PushoverChannel, PushoverOptions};
pub use pusher::{PusherChannel, PusherOptions};
pub use slack::{SlackChannel, SlackOptions};
pub use sms::{SmsChannel, SmsOptions};
pub use smtp::{SmtpChannel, SmtpOptions};
pub use store::{
    JsonlNotificationStore, MemoryNotificationStore, NotificationStore, StoreChannel, StoreOptions,
};
pub use telegram::{TelegramChannel, TelegramOptions};
pub use webhook::{WebhookChannel, WebhookOptions};

use crate::core::{Channel, ChannelKind};
use crate::error::{ConfigError, SendError};
use crate::templates::TemplateStore;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Settings for one channel, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelSettings {
    Slack(SlackOptions),
    Telegram(TelegramOptions),
    Webhook(WebhookOptions),
    Smtp(SmtpOptions),
    Mail(MailOptions),
    Sms(SmsOptions),
    Pushbullet(PushbulletOptions),
    Pushover(PushoverOptions),
    Ifttt(IftttOptions),
    Pusher(PusherOptions),
    Mqtt(MqttOptions),
    Store(StoreOptions),
}

impl ChannelSettings {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelSettings::Slack(_) => ChannelKind::Slack,
            ChannelSettings::Telegram(_) => ChannelKind::Telegram,
            ChannelSettings::Webhook(_) => ChannelKind::Webhook,
            ChannelSettings::Smtp(_) => ChannelKind::Smtp,
            ChannelSettings::Mail(_) => ChannelKind::Mail,
            ChannelSettings::Sms(_) => ChannelKind::Sms,
            ChannelSettings::Pushbullet(_) => ChannelKind::Pushbullet,
            ChannelSettings::Pushover(_) => ChannelKind::Pushover,
            ChannelSettings::Ifttt(_) => ChannelKind::Ifttt,
            ChannelSettings::Pusher(_) => ChannelKind::Pusher,
            ChannelSettings::Mqtt(_) => ChannelKind::Mqtt,
            ChannelSettings::Store(_) => ChannelKind::Store,
        }
    }
}

/// A named channel entry, as it appears under `[[channels]]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Defaults to the channel kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub settings: ChannelSettings,
}

impl ChannelConfig {
    pub fn new(settings: ChannelSettings) -> Self {
        Self {
            name: None,
            settings,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.settings.kind().to_string())
    }
}

/// Collaborators handed to channels that need them.
#[derive(Clone)]
pub struct ChannelDeps {
    pub templates: Arc<dyn TemplateStore>,
    /// Overrides the store built from `StoreOptions::path`.
    pub store: Option<Arc<dyn NotificationStore>>,
}

impl ChannelDeps {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            templates,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn NotificationStore>) -> Self {
        self.store = Some(store);
        self
    }
}

/// Builds a single channel from its configuration.
pub fn build(config: &ChannelConfig, deps: &ChannelDeps) -> Result<Arc<dyn Channel>, ConfigError> {
    let name = config.display_name();
    let channel: Arc<dyn Channel> = match &config.settings {
        ChannelSettings::Slack(o) => Arc::new(SlackChannel::new(o.clone())?.named(name)),
        ChannelSettings::Telegram(o) => Arc::new(TelegramChannel::new(o.clone())?.named(name)),
        ChannelSettings::Webhook(o) => Arc::new(WebhookChannel::new(o.clone())?.named(name)),
        ChannelSettings::Smtp(o) => {
            Arc::new(SmtpChannel::new(o.clone(), deps.templates.clone())?.named(name))
        }
        ChannelSettings::Mail(o) => Arc::new(MailChannel::new(o.clone())?.named(name)),
        ChannelSettings::Sms(o) => Arc::new(SmsChannel::new(o.clone())?.named(name)),
        ChannelSettings::Pushbullet(o) => Arc::new(PushbulletChannel::new(o.clone())?.named(name)),
        ChannelSettings::Pushover(o) => Arc::new(PushoverChannel::new(o.clone())?.named(name)),
        ChannelSettings::Ifttt(o) => Arc::new(IftttChannel::new(o.clone())?.named(name)),
        ChannelSettings::Pusher(o) => Arc::new(PusherChannel::new(o.clone())?.named(name)),
        ChannelSettings::Mqtt(o) => Arc::new(MqttChannel::new(o.clone())?.named(name)),
        ChannelSettings::Store(o) => {
            let store = match &deps.store {
                Some(store) => store.clone(),
                None => Arc::new(JsonlNotificationStore::new(o)?) as Arc<dyn NotificationStore>,
            };
            Arc::new(StoreChannel::new(store).named(name))
        }
    };
    info!(channel = channel.name(), kind = %channel.kind(), "Channel configured");
    Ok(channel)
}

/// Builds every configured channel, in order. Fails on the first invalid
/// entry or on a repeated name.
pub fn build_all(
    configs: &[ChannelConfig],
    deps: &ChannelDeps,
) -> Result<Vec<Arc<dyn Channel>>, ConfigError> {
    let mut seen = HashSet::new();
    configs
        .iter()
        .map(|config| {
            let name = config.display_name();
            if !seen.insert(name.clone()) {
                return Err(ConfigError::InvalidValue {
                    channel: config.settings.kind(),
                    field: "name",
                    reason: format!("duplicate channel name '{}'", name),
                });
            }
            build(config, deps)
        })
        .collect()
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn require(
    channel: ChannelKind,
    field: &'static str,
    value: &str,
) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { channel, field });
    }
    Ok(())
}

pub(crate) fn require_url(
    channel: ChannelKind,
    field: &'static str,
    value: &str,
) -> Result<(), ConfigError> {
    require(channel, field, value)?;
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            channel,
            field,
            value: value.to_string(),
        }),
    }
}

pub(crate) fn require_email(
    channel: ChannelKind,
    field: &'static str,
    value: &str,
) -> Result<Mailbox, ConfigError> {
    require(channel, field, value)?;
    value.parse::<Mailbox>().map_err(|_| ConfigError::InvalidEmail {
        channel,
        field,
        value: value.to_string(),
    })
}

/// Validates an optional API base URL and returns it without a trailing slash.
pub(crate) fn api_base(
    channel: ChannelKind,
    configured: Option<&str>,
    default: &str,
) -> Result<String, ConfigError> {
    match configured.filter(|u| !u.is_empty()) {
        Some(url) => {
            require_url(channel, "api_url", url)?;
            Ok(url.trim_end_matches('/').to_string())
        }
        None => Ok(default.to_string()),
    }
}

pub(crate) fn http_transport(
    channel: ChannelKind,
    timeout: Duration,
) -> Result<Arc<dyn HttpTransport>, ConfigError> {
    let transport = ReqwestTransport::new(timeout).map_err(|e| ConfigError::Client {
        channel,
        reason: e.to_string(),
    })?;
    Ok(Arc::new(transport))
}

/// Posts once and maps a non-2xx answer to [`SendError::Rejected`].
pub(crate) async fn post(
    transport: &dyn HttpTransport,
    channel: ChannelKind,
    request: HttpRequest,
) -> Result<HttpResponse, SendError> {
    transport.post(request).await?.ensure_success(channel)
}
