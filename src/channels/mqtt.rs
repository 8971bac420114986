//! MQTT publish.
//!
//! The whole message is published as JSON on a fixed topic, at least once.

use super::require;
use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use crate::transport::{MqttTransport, RumqttcPublisher, DEFAULT_MQTT_TIMEOUT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_CLIENT_ID: &str = "notifyhub";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttOptions {
    /// Broker address, `mqtt://host[:port]` or `tcp://host[:port]`.
    pub uri: String,
    pub topic: String,
    /// Both or neither of username and password.
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for MqttOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttOptions")
            .field("uri", &self.uri)
            .field("topic", &self.topic)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl MqttOptions {
    pub fn new(uri: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Splits `uri` into host and port.
    fn broker(&self) -> Result<(String, u16), ConfigError> {
        let kind = ChannelKind::Mqtt;
        require(kind, "uri", &self.uri)?;
        let invalid = || ConfigError::InvalidUrl {
            channel: kind,
            field: "uri",
            value: self.uri.clone(),
        };
        let url = Url::parse(&self.uri).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "mqtt" | "tcp") {
            return Err(invalid());
        }
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        Ok((host.to_string(), url.port().unwrap_or(DEFAULT_PORT)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let kind = ChannelKind::Mqtt;
        require(kind, "topic", &self.topic)?;
        if self.topic.contains(['+', '#']) {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "topic",
                reason: "wildcards are not allowed in a publish topic".to_string(),
            });
        }
        if self.username.is_empty() != self.password.is_empty() {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "password",
                reason: "username and password must be set together".to_string(),
            });
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                channel: kind,
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

pub struct MqttChannel {
    name: String,
    topic: String,
    transport: Arc<dyn MqttTransport>,
}

impl MqttChannel {
    pub fn new(options: MqttOptions) -> Result<Self, ConfigError> {
        let (host, port) = options.broker()?;
        options.validate()?;

        let timeout = options
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MQTT_TIMEOUT);
        let client_id = options
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());
        let mut publisher = RumqttcPublisher::new(host, port, client_id, timeout);
        if !options.username.is_empty() {
            publisher = publisher.with_credentials(options.username, options.password);
        }

        Ok(Self {
            name: ChannelKind::Mqtt.to_string(),
            topic: options.topic,
            transport: Arc::new(publisher),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn MqttTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Channel for MqttChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Mqtt
    }

    #[instrument(skip(self, message), fields(channel = %self.name, topic = %self.topic))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.body.is_empty() {
            return Err(SendError::validation("message body is empty"));
        }
        let payload = serde_json::to_vec(message)
            .map_err(|e| SendError::validation(format!("failed to encode message: {}", e)))?;

        self.transport.publish(&self.topic, payload).await?;
        info!("Successfully published message to MQTT broker.");
        Ok(())
    }
}
