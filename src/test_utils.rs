//! Test doubles for the transport seams and the channel trait.

use crate::core::{Channel, ChannelKind, Message};
use crate::error::SendError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, MailTransport, MqttTransport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records every request and answers with a fixed response.
pub struct RecordingHttpTransport {
    requests: Mutex<Vec<HttpRequest>>,
    response: Result<HttpResponse, SendError>,
}

impl RecordingHttpTransport {
    /// Answers every request with `200 OK`.
    pub fn new() -> Self {
        Self::responding(HttpResponse::ok())
    }

    pub fn responding(response: HttpResponse) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Ok(response),
        }
    }

    pub fn failing(error: SendError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Err(error),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for RecordingHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for RecordingHttpTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, SendError> {
        self.requests.lock().unwrap().push(request);
        self.response.clone()
    }
}

/// Records every email handed to it.
#[derive(Default)]
pub struct RecordingMailTransport {
    sent: Mutex<Vec<lettre::Message>>,
    error: Option<SendError>,
}

impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SendError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            error: Some(error),
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// The raw RFC 5322 text of every recorded email.
    pub fn formatted(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.formatted()).into_owned())
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn deliver(&self, email: lettre::Message) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(email);
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Records every MQTT publish as `(topic, payload)`.
#[derive(Default)]
pub struct RecordingMqttTransport {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    error: Option<SendError>,
}

impl RecordingMqttTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SendError) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            error: Some(error),
        }
    }

    pub fn calls(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MqttTransport for RecordingMqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SendError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// A channel with a scripted outcome.
pub struct MockChannel {
    name: String,
    kind: ChannelKind,
    outcome: Result<(), SendError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    received: Mutex<Vec<Message>>,
}

impl MockChannel {
    pub fn succeeding(name: impl Into<String>) -> Self {
        Self::with_outcome(name, Ok(()))
    }

    pub fn failing(name: impl Into<String>, error: SendError) -> Self {
        Self::with_outcome(name, Err(error))
    }

    fn with_outcome(name: impl Into<String>, outcome: Result<(), SendError>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Webhook,
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, message: &Message) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(message.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
