//! Persists notifications so they can be listed per user later.

use crate::core::{Channel, ChannelKind, Message};
use crate::error::{ConfigError, SendError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreOptions {
    /// JSON-lines file records are appended to.
    pub path: PathBuf,
}

/// Where stored notifications end up.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, message: &Message) -> Result<(), SendError>;
}

/// Appends one JSON document per line.
#[derive(Debug)]
pub struct JsonlNotificationStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlNotificationStore {
    pub fn new(options: &StoreOptions) -> Result<Self, ConfigError> {
        if options.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                channel: ChannelKind::Store,
                field: "path",
            });
        }
        Ok(Self {
            path: options.path.clone(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }
}

#[async_trait]
impl NotificationStore for JsonlNotificationStore {
    async fn insert(&self, message: &Message) -> Result<(), SendError> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| SendError::validation(format!("failed to encode message: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                SendError::transport(format!("failed to open {}: {}", self.path.display(), e))
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SendError::transport(format!("failed to write record: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| SendError::transport(format!("failed to flush record: {}", e)))?;
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    records: Mutex<Vec<Message>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Message> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Records belonging to one user, oldest first.
    pub fn for_user(&self, user_id: &str) -> Vec<Message> {
        self.records()
            .into_iter()
            .filter(|m| m.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, message: &Message) -> Result<(), SendError> {
        self.records
            .lock()
            .map_err(|_| SendError::transport("notification store lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

/// A channel whose side effect is a store insert.
pub struct StoreChannel {
    name: String,
    store: Arc<dyn NotificationStore>,
}

impl StoreChannel {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            name: ChannelKind::Store.to_string(),
            store,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Channel for StoreChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Store
    }

    #[instrument(skip(self, message), fields(channel = %self.name))]
    async fn send(&self, message: &Message) -> Result<(), SendError> {
        if message.user_id.is_empty() {
            return Err(SendError::validation("message has no user id"));
        }
        self.store.insert(message).await?;
        debug!(user_id = %message.user_id, "Stored notification");
        Ok(())
    }
}
