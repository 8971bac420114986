/// notifyhub - fans notification events out to heterogeneous delivery backends
///
/// This library provides the message model, the template substitution
/// engine, the channel abstraction with its canonical backends, and the
/// dispatcher that drives them.
pub mod channels;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod template;
pub mod templates;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export core types for convenience
pub use crate::core::*;
pub use dispatch::{dispatch, DispatchMode, DispatchOutcome, DispatchReport, Dispatcher};
pub use error::{ConfigError, SendError};
