//! Command-Line Interface (CLI) argument parsing.
//!
//! The arguments are parsed at startup and then merged on top of the
//! configuration from `notifyhub.toml` and environment variables.

use crate::core::Message;
use crate::dispatch::DispatchMode;
use anyhow::{Context, Result};
use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Sends one event through every configured notification channel.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON file holding the message to send, or `-` for stdin.
    #[arg(short, long, value_name = "FILE", required_unless_present = "check")]
    pub message: Option<PathBuf>,

    /// Send to channels one at a time or all at once.
    #[arg(long, value_enum)]
    pub mode: Option<DispatchMode>,

    /// Logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory holding email templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Validate the configuration and exit without sending.
    #[arg(long)]
    pub check: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(mode) = self.mode {
            dict.insert(
                "dispatch".into(),
                section("mode", Value::from(mode.as_str().to_string())),
            );
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(dir) = &self.templates {
            dict.insert(
                "templates".into(),
                section("directory", Value::from(dir.display().to_string())),
            );
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

fn section(key: &str, value: Value) -> Value {
    let mut inner = Dict::new();
    inner.insert(key.into(), value);
    Value::Dict(Tag::Default, inner)
}

/// Reads a JSON message from `path`, or from stdin when `path` is `-`.
pub fn read_message(path: &Path) -> Result<Message> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read message from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message file {}", path.display()))?
    };
    let message = serde_json::from_str(&raw).context("Message is not valid JSON")?;
    Ok(message)
}
