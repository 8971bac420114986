#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use assert_cmd::prelude::*;
use helpers::mock_backend::{backend_responding, received_json};
use helpers::temp_file;
use predicates::str::contains;
use std::process::Command;

fn notifyhub_bin() -> Result<Command> {
    Ok(Command::cargo_bin("notifyhub")?)
}

#[test]
fn test_check_accepts_valid_config() -> Result<()> {
    let config = temp_file(
        r#"
        [[channels]]
        type = "webhook"
        url = "https://example.com/hook"
        "#,
    );

    let mut cmd = notifyhub_bin()?;
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(config.path())
        .arg("--check");

    cmd.assert()
        .success()
        .stderr(contains("Configuration OK: 1 channel(s) ready"));
    Ok(())
}

#[test]
fn test_check_rejects_invalid_channel() -> Result<()> {
    let config = temp_file(
        r#"
        [[channels]]
        type = "webhook"
        url = "not a url"
        "#,
    );

    let mut cmd = notifyhub_bin()?;
    cmd.arg("--config").arg(config.path()).arg("--check");

    cmd.assert()
        .failure()
        .stderr(contains("webhook: `url` is not a valid URL"));
    Ok(())
}

#[test]
fn test_message_is_required_without_check() -> Result<()> {
    let mut cmd = notifyhub_bin()?;
    cmd.arg("--config").arg("/nonexistent/notifyhub.toml");

    cmd.assert().failure().stderr(contains("--message"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatch_prints_one_line_per_channel() -> Result<()> {
    let ok = backend_responding("/ok", 200).await;
    let broken = backend_responding("/broken", 503).await;
    let config = temp_file(&format!(
        r#"
        [[channels]]
        type = "webhook"
        name = "primary"
        url = "{ok}/ok"

        [[channels]]
        type = "webhook"
        name = "backup"
        url = "{broken}/broken"
        "#,
        ok = ok.uri(),
        broken = broken.uri(),
    ));
    let message = temp_file(r#"{"type": "alert", "title": "Disk", "body": "Disk almost full"}"#);

    let mut cmd = notifyhub_bin()?;
    cmd.arg("--config")
        .arg(config.path())
        .arg("--message")
        .arg(message.path());
    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;

    output
        .assert()
        .failure()
        .code(2)
        .stdout(contains("ok      primary (webhook)"))
        .stdout(contains("FAILED  backup (webhook)"));
    let posted = received_json(&ok).await;
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["body"], "Disk almost full");
    Ok(())
}
