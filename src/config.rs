//! Configuration management for notifyhub
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, a `notifyhub.toml` file,
//! `NOTIFYHUB_*` environment variables and command-line flags.

use crate::channels::{self, ChannelConfig, ChannelDeps};
use crate::cli::Cli;
use crate::core::Channel;
use crate::dispatch::{DispatchMode, Dispatcher};
use crate::error::ConfigError;
use crate::templates::FileTemplateStore;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// The file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "notifyhub.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// How channels are scheduled during a dispatch.
    pub dispatch: DispatchConfig,
    /// Where email templates are read from.
    pub templates: TemplatesConfig,
    /// The configured delivery channels, in dispatch order.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TemplatesConfig {
    /// Directory holding `<id>.html` and `<id>.txt` files.
    pub directory: PathBuf,
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file, the
    /// environment and the command-line flags, in that order.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config: Config = Self::figment(cli).extract()?;
        Ok(config)
    }

    pub fn figment(cli: &Cli) -> Figment {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // e.g. NOTIFYHUB_DISPATCH__MODE=concurrent
            .merge(Env::prefixed("NOTIFYHUB_").split("__"))
            .merge(cli.clone())
    }

    /// Builds every configured channel, failing on the first invalid entry.
    pub fn build_channels(&self) -> Result<Vec<Arc<dyn Channel>>, ConfigError> {
        let deps = ChannelDeps::new(Arc::new(FileTemplateStore::new(
            self.templates.directory.clone(),
        )));
        channels::build_all(&self.channels, &deps)
    }

    pub fn dispatcher(&self) -> Result<Dispatcher, ConfigError> {
        Ok(Dispatcher::new(self.build_channels()?, self.dispatch.mode))
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dispatch: DispatchConfig::default(),
            templates: TemplatesConfig {
                directory: PathBuf::from("templates"),
            },
            channels: vec![],
        }
    }
}
