#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::temp_file;
use notifyhub::channels::ChannelSettings;
use notifyhub::cli::Cli;
use notifyhub::config::Config;
use notifyhub::{ChannelKind, ConfigError, DispatchMode};
use serial_test::serial;
use std::path::PathBuf;

fn cli_for(file: &tempfile::NamedTempFile) -> Cli {
    Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let file = temp_file(
        r#"
        log_level = "debug"
        [dispatch]
        mode = "concurrent"
        [templates]
        directory = "/etc/notifyhub/templates"

        [[channels]]
        type = "slack"
        name = "ops"
        hook = "https://hooks.slack.com/services/T/B/X"
        username = "notifyhub"

        [[channels]]
        type = "smtp"
        server = "smtp.example.com"
        port = 587
        username = "mailer"
        password = "secret"
        email_from = "alerts@example.com"
        email_to = "ops@example.com"
        template_id = "detection"

        [[channels]]
        type = "webhook"
        url = "https://example.com/hook"
        timeout_secs = 3
        "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.dispatch.mode, DispatchMode::Concurrent);
    assert_eq!(
        config.templates.directory,
        PathBuf::from("/etc/notifyhub/templates")
    );
    assert_eq!(config.channels.len(), 3);
    assert_eq!(config.channels[0].display_name(), "ops");
    assert_eq!(config.channels[1].display_name(), "smtp");
    match &config.channels[1].settings {
        ChannelSettings::Smtp(smtp) => {
            assert_eq!(smtp.port, 587);
            assert_eq!(smtp.template_id.as_deref(), Some("detection"));
        }
        other => panic!("expected smtp settings, got {:?}", other),
    }

    let dispatcher = config.dispatcher().unwrap();
    let kinds: Vec<_> = dispatcher.channels().iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![ChannelKind::Slack, ChannelKind::Smtp, ChannelKind::Webhook]
    );
    assert_eq!(dispatcher.mode(), DispatchMode::Concurrent);
}

#[test]
#[serial]
fn test_defaults_apply_without_a_file() {
    let cli = Cli {
        config: Some(PathBuf::from("/nonexistent/notifyhub.toml")),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();

    assert_eq!(config, Config::default());
    assert!(config.dispatcher().unwrap().channels().is_empty());
}

#[test]
#[serial]
fn test_env_overrides_file_and_cli_overrides_env() {
    let file = temp_file(
        r#"
        log_level = "warn"
        [dispatch]
        mode = "sequential"
        "#,
    );
    std::env::set_var("NOTIFYHUB_LOG_LEVEL", "debug");
    std::env::set_var("NOTIFYHUB_DISPATCH__MODE", "concurrent");

    let from_env = Config::load(&cli_for(&file)).unwrap();
    let cli = Cli {
        mode: Some(DispatchMode::Sequential),
        log_level: Some("trace".to_string()),
        templates: Some(PathBuf::from("/srv/templates")),
        ..cli_for(&file)
    };
    let from_cli = Config::load(&cli).unwrap();

    std::env::remove_var("NOTIFYHUB_LOG_LEVEL");
    std::env::remove_var("NOTIFYHUB_DISPATCH__MODE");

    assert_eq!(from_env.log_level, "debug");
    assert_eq!(from_env.dispatch.mode, DispatchMode::Concurrent);
    assert_eq!(from_cli.log_level, "trace");
    assert_eq!(from_cli.dispatch.mode, DispatchMode::Sequential);
    assert_eq!(from_cli.templates.directory, PathBuf::from("/srv/templates"));
}

#[test]
#[serial]
fn test_invalid_channel_fails_at_build_time() {
    let file = temp_file(
        r#"
        [[channels]]
        type = "smtp"
        server = "smtp.example.com"
        port = 0
        username = "mailer"
        password = "secret"
        email_from = "alerts@example.com"
        email_to = "ops@example.com"
        "#,
    );

    let config = Config::load(&cli_for(&file)).unwrap();
    let err = config.dispatcher().unwrap_err();

    assert_eq!(
        err,
        ConfigError::InvalidPort {
            channel: ChannelKind::Smtp
        }
    );
}

#[test]
#[serial]
fn test_missing_field_is_reported_by_name() {
    let file = temp_file(
        r#"
        [[channels]]
        type = "telegram"
        channel = "@alerts"
        "#,
    );

    let err = Config::load(&cli_for(&file))
        .unwrap()
        .dispatcher()
        .unwrap_err();

    assert_eq!(err.to_string(), "telegram: missing required field `token`");
}

#[test]
#[serial]
fn test_unknown_channel_type_is_rejected() {
    let file = temp_file(
        r#"
        [[channels]]
        type = "carrier-pigeon"
        "#,
    );

    assert!(Config::load(&cli_for(&file)).is_err());
}
