//! Outbound transports used by channels.
//!
//! Channels never talk to `reqwest`, `lettre` or `rumqttc` directly. They go
//! through [`HttpTransport`], [`MailTransport`] and [`MqttTransport`] so a test
//! can substitute the single backend call each send makes.

use crate::core::ChannelKind;
use crate::error::SendError;
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use rumqttc::{AsyncClient, ConnectionError, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use std::time::Duration;
use tokio::task;
use tracing::{debug, error};

/// Default bound on a single HTTP call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on each SMTP command.
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on connecting to a broker and getting a publish acknowledged.
pub const DEFAULT_MQTT_TIMEOUT: Duration = Duration::from_secs(10);

/// The payload of an outbound POST.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// An outbound POST request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub body: HttpBody,
}

impl HttpRequest {
    pub fn json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: HttpBody::Json(body),
        }
    }

    pub fn form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: HttpBody::Form(fields),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// The JSON payload, if this is a JSON request.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            HttpBody::Json(v) => Some(v),
            HttpBody::Form(_) => None,
        }
    }

    /// Looks up a form field, if this is a form request.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match &self.body {
            HttpBody::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            HttpBody::Json(_) => None,
        }
    }
}

/// What came back from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx answer into [`SendError::Rejected`].
    pub fn ensure_success(self, backend: ChannelKind) -> Result<Self, SendError> {
        if self.is_success() {
            return Ok(self);
        }
        error!(
            backend = %backend,
            status = self.status,
            body = %self.body,
            "Backend rejected notification"
        );
        Err(SendError::rejected(Some(self.status), self.body))
    }
}

/// Sends one HTTP POST.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, SendError>;
}

/// Production transport backed by a `reqwest::Client` with a fixed timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, SendError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        builder = match &request.body {
            HttpBody::Json(value) => builder.json(value),
            HttpBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await.map_err(|e| {
            let err = SendError::from(e);
            error!(error = %err, "HTTP request failed");
            err
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, "HTTP request completed");
        Ok(HttpResponse { status, body })
    }
}

/// Hands one email to a mail server.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: lettre::Message) -> Result<(), SendError>;
}

/// Production SMTP transport. Port 465 uses implicit TLS, anything else
/// STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout,
        }
    }

    /// Dials the server and sends in a blocking manner.
    fn send_blocking(&self, email: &lettre::Message) -> Result<(), SendError> {
        let builder = if self.port == 465 {
            SmtpTransport::relay(&self.server)
        } else {
            SmtpTransport::starttls_relay(&self.server)
        }
        .map_err(|e| SendError::transport(format!("invalid SMTP server: {}", e)))?;

        let mailer = builder
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        mailer.send(email).map(|_| ()).map_err(classify_smtp_error)
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn classify_smtp_error(e: lettre::transport::smtp::Error) -> SendError {
    if e.is_permanent() || e.is_transient() {
        let status = e.status().and_then(|code| code.to_string().parse().ok());
        SendError::rejected(status, e.to_string())
    } else {
        SendError::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, email: lettre::Message) -> Result<(), SendError> {
        let mailer = self.clone();
        let result = task::spawn_blocking(move || mailer.send_blocking(&email)).await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(server = %self.server, error = %e, "SMTP delivery failed");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "SMTP delivery task failed");
                Err(SendError::transport(format!("SMTP task failed: {}", e)))
            }
        }
    }
}

/// Publishes one MQTT message.
#[async_trait]
pub trait MqttTransport: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SendError>;
}

/// Production MQTT transport. Every publish opens a clean session, sends at
/// QoS 1 and returns once the broker acknowledged it.
#[derive(Clone)]
pub struct RumqttcPublisher {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl RumqttcPublisher {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            credentials: None,
            timeout,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_clean_session(true);
        options.set_keep_alive(Duration::from_secs(30));
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

impl std::fmt::Debug for RumqttcPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RumqttcPublisher")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn classify_mqtt_error(e: ConnectionError) -> SendError {
    match e {
        ConnectionError::ConnectionRefused(code) => {
            SendError::rejected(None, format!("broker refused connection: {:?}", code))
        }
        other => SendError::transport(other.to_string()),
    }
}

#[async_trait]
impl MqttTransport for RumqttcPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SendError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| SendError::transport(format!("failed to queue publish: {}", e)))?;

        let acknowledged = tokio::time::timeout(self.timeout, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(classify_mqtt_error(e)),
                }
            }
        })
        .await;

        match acknowledged {
            Ok(Ok(())) => {
                debug!(host = %self.host, topic, "MQTT publish acknowledged");
                if let Err(e) = client.try_disconnect() {
                    debug!(error = %e, "MQTT disconnect not queued");
                }
                Ok(())
            }
            Ok(Err(e)) => {
                error!(host = %self.host, error = %e, "MQTT publish failed");
                Err(e)
            }
            Err(_) => {
                error!(host = %self.host, "MQTT publish timed out");
                Err(SendError::Transport {
                    message: format!(
                        "no acknowledgement from {} within {:?}",
                        self.host, self.timeout
                    ),
                    timeout: true,
                })
            }
        }
    }
}
