//! Fans one message out to a set of channels and collects per-channel outcomes.

use crate::core::{Channel, ChannelKind, Message};
use crate::error::SendError;
use futures::future::join_all;
use metrics::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// How the dispatcher schedules channel sends.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One channel at a time, in order.
    #[default]
    Sequential,
    /// All channels at once.
    Concurrent,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Sequential => "sequential",
            DispatchMode::Concurrent => "concurrent",
        }
    }
}

/// The result of sending through one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub channel: String,
    pub kind: ChannelKind,
    pub result: Result<(), SendError>,
    pub elapsed: Duration,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(
                f,
                "ok      {} ({}) in {}ms",
                self.channel,
                self.kind,
                self.elapsed.as_millis()
            ),
            Err(e) => write!(f, "FAILED  {} ({}): {}", self.channel, self.kind, e),
        }
    }
}

/// Outcomes in the order the channels were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(DispatchOutcome::is_success)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Registers descriptions for the dispatcher's metrics with the global recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "notifications_sent_total",
        Unit::Count,
        "Total number of notifications acknowledged by a backend, labeled by channel kind."
    );
    metrics::describe_counter!(
        "notifications_failed_total",
        Unit::Count,
        "Total number of notification sends that failed, labeled by channel kind."
    );
    metrics::describe_histogram!(
        "notification_send_duration_seconds",
        Unit::Seconds,
        "A histogram of the time taken by a single channel send."
    );
}

/// Sends `message` through every channel in `channels`.
///
/// A failing channel never stops the others, and the report lists outcomes
/// in input order regardless of `mode`.
#[instrument(skip_all, fields(channels = channels.len(), mode = mode.as_str()))]
pub async fn dispatch(
    message: &Message,
    channels: &[Arc<dyn Channel>],
    mode: DispatchMode,
) -> DispatchReport {
    let outcomes = match mode {
        DispatchMode::Sequential => {
            let mut outcomes = Vec::with_capacity(channels.len());
            for channel in channels {
                outcomes.push(send_one(channel.as_ref(), message).await);
            }
            outcomes
        }
        DispatchMode::Concurrent => {
            join_all(
                channels
                    .iter()
                    .map(|channel| send_one(channel.as_ref(), message)),
            )
            .await
        }
    };

    let report = DispatchReport { outcomes };
    info!(
        succeeded = report.succeeded().count(),
        failed = report.failed().count(),
        "Dispatch complete"
    );
    report
}

async fn send_one(channel: &dyn Channel, message: &Message) -> DispatchOutcome {
    let kind = channel.kind();
    let start = Instant::now();
    let result = channel.send(message).await;
    let elapsed = start.elapsed();

    metrics::histogram!("notification_send_duration_seconds", "channel" => kind.as_str())
        .record(elapsed.as_secs_f64());
    match &result {
        Ok(()) => {
            metrics::counter!("notifications_sent_total", "channel" => kind.as_str())
                .increment(1);
            info!(channel = channel.name(), kind = %kind, ?elapsed, "Notification sent");
        }
        Err(e) => {
            metrics::counter!("notifications_failed_total", "channel" => kind.as_str())
                .increment(1);
            error!(channel = channel.name(), kind = %kind, error = %e, "Notification failed");
        }
    }

    DispatchOutcome {
        channel: channel.name().to_string(),
        kind,
        result,
        elapsed,
    }
}

/// A fixed set of channels paired with a scheduling mode.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    channels: Vec<Arc<dyn Channel>>,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Channel>>, mode: DispatchMode) -> Self {
        Self { channels, mode }
    }

    pub fn channels(&self) -> &[Arc<dyn Channel>] {
        &self.channels
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn dispatch(&self, message: &Message) -> DispatchReport {
        dispatch(message, &self.channels, self.mode).await
    }
}
