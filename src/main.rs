//! notifyhub - send one event through every configured notification channel.

use anyhow::{Context, Result};
use clap::Parser;
use notifyhub::{
    cli::{read_message, Cli},
    config::Config,
    dispatch::describe_metrics,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("error");
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    init_tracing(&config.log_level);
    info!("notifyhub starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Dispatch Mode: {}", config.dispatch.mode.as_str());
    info!("Template Directory: {}", config.templates.directory.display());
    info!("Channels: {}", config.channels.len());
    info!("-------------------------------------------------------");

    describe_metrics();
    let dispatcher = config
        .dispatcher()
        .context("Invalid channel configuration")?;

    if cli.check {
        info!(
            "Configuration OK: {} channel(s) ready",
            dispatcher.channels().len()
        );
        return Ok(());
    }

    let Some(path) = cli.message.as_deref() else {
        anyhow::bail!("--message is required unless --check is given");
    };
    let message = read_message(path)?;
    let report = dispatcher.dispatch(&message).await;

    for outcome in &report.outcomes {
        println!("{}", outcome);
    }

    if !report.all_succeeded() {
        error!(
            "{} of {} channel(s) failed",
            report.failed().count(),
            report.len()
        );
        std::process::exit(2);
    }
    Ok(())
}
