//! Error types for channel construction and delivery.

use crate::core::ChannelKind;
use thiserror::Error;

/// Raised while constructing a channel from its options.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{channel}: missing required field `{field}`")]
    MissingField {
        channel: ChannelKind,
        field: &'static str,
    },

    #[error("{channel}: `{field}` is not a valid URL: {value}")]
    InvalidUrl {
        channel: ChannelKind,
        field: &'static str,
        value: String,
    },

    #[error("{channel}: `{field}` is not a valid email address: {value}")]
    InvalidEmail {
        channel: ChannelKind,
        field: &'static str,
        value: String,
    },

    #[error("{channel}: port must be greater than zero")]
    InvalidPort { channel: ChannelKind },

    #[error("{channel}: invalid `{field}`: {reason}")]
    InvalidValue {
        channel: ChannelKind,
        field: &'static str,
        reason: String,
    },

    #[error("{channel}: failed to build transport client: {reason}")]
    Client { channel: ChannelKind, reason: String },
}

/// Raised by a single send attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Required text was empty; nothing left the process.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend could not be reached.
    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    /// The backend answered but refused the notification.
    #[error("backend rejected notification (status {status:?}): {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },

    /// The template store could not provide the requested template.
    #[error("template error: {0}")]
    Template(String),
}

impl SendError {
    pub fn validation(message: impl Into<String>) -> Self {
        SendError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        SendError::Transport {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        SendError::Rejected {
            status,
            message: message.into(),
        }
    }

    /// True when the failure happened before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, SendError::Validation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::Transport { timeout: true, .. })
    }
}

/// The request URL is dropped: some backends carry credentials in the path.
impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        SendError::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
        }
    }
}
