//! End-to-end dispatch: configuration in, per-channel outcomes out.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::mock_backend::{backend_responding, received_json};
use helpers::{detection_message, temp_file};
use notifyhub::channels::{
    build_all, ChannelConfig, ChannelDeps, ChannelSettings, MemoryNotificationStore, StoreOptions,
    WebhookOptions,
};
use notifyhub::cli::Cli;
use notifyhub::config::Config;
use notifyhub::templates::InMemoryTemplateStore;
use notifyhub::{dispatch, ChannelKind, DispatchMode, SendError};
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_failing_backend_does_not_block_the_others() {
    // Arrange
    let webhook = backend_responding("/events", 200).await;
    let slack = backend_responding("/slack", 500).await;
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("notifications.jsonl");

    let toml = format!(
        r#"
        [dispatch]
        mode = "concurrent"

        [[channels]]
        type = "webhook"
        name = "audit"
        url = "{webhook}/events"

        [[channels]]
        type = "slack"
        name = "ops"
        hook = "{slack}/slack"
        username = "notifyhub"

        [[channels]]
        type = "store"
        path = "{store}"
        "#,
        webhook = webhook.uri(),
        slack = slack.uri(),
        store = store_path.display(),
    );
    let file = temp_file(&toml);
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let dispatcher = Config::load(&cli).unwrap().dispatcher().unwrap();
    let message = detection_message();

    // Act
    let report = dispatcher.dispatch(&message).await;

    // Assert
    let summary: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.channel.as_str(), o.kind, o.is_success()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("audit", ChannelKind::Webhook, true),
            ("ops", ChannelKind::Slack, false),
            ("store", ChannelKind::Store, true),
        ]
    );
    assert!(matches!(
        report.outcomes[1].result,
        Err(SendError::Rejected {
            status: Some(500),
            ..
        })
    ));

    let posted = received_json(&webhook).await;
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["title"], "Motion detected");
    assert_eq!(posted[0]["media"][0]["url"], "https://cdn.example.com/clip.mp4");

    let stored = std::fs::read_to_string(&store_path).unwrap();
    assert_eq!(stored.lines().count(), 1);
}

#[tokio::test]
async fn test_validation_failure_is_reported_per_channel() {
    let webhook = backend_responding("/events", 200).await;
    let store = Arc::new(MemoryNotificationStore::new());
    let deps = ChannelDeps::new(Arc::new(InMemoryTemplateStore::new())).with_store(store.clone());
    let configs = vec![
        ChannelConfig::new(ChannelSettings::Store(StoreOptions::default())),
        ChannelConfig::new(ChannelSettings::Webhook(WebhookOptions::new(format!(
            "{}/events",
            webhook.uri()
        )))),
    ];
    let channels = build_all(&configs, &deps).unwrap();

    let mut message = detection_message();
    message.user_id.clear();
    let report = dispatch(&message, &channels, DispatchMode::Sequential).await;

    assert!(report.outcomes[0].result.as_ref().unwrap_err().is_validation());
    assert!(report.outcomes[1].is_success());
    assert!(store.records().is_empty());
    assert_eq!(received_json(&webhook).await.len(), 1);
}

#[tokio::test]
async fn test_channel_set_is_reusable_across_dispatches() {
    let webhook = backend_responding("/events", 200).await;
    let deps = ChannelDeps::new(Arc::new(InMemoryTemplateStore::new()));
    let configs = vec![ChannelConfig::new(ChannelSettings::Webhook(WebhookOptions::new(
        format!("{}/events", webhook.uri()),
    )))];
    let channels = build_all(&configs, &deps).unwrap();

    let first = detection_message();
    let mut second = detection_message();
    second.title = "Second event".to_string();
    let (a, b) = tokio::join!(
        dispatch(&first, &channels, DispatchMode::Concurrent),
        dispatch(&second, &channels, DispatchMode::Concurrent),
    );

    assert!(a.all_succeeded());
    assert!(b.all_succeeded());
    let mut titles: Vec<String> = received_json(&webhook)
        .await
        .iter()
        .map(|v| v["title"].as_str().unwrap().to_string())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Motion detected", "Second event"]);
}
