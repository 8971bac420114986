#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::detection_message;
use notifyhub::channels::{SmtpChannel, SmtpOptions};
use notifyhub::template::{render, VOCABULARY};
use notifyhub::templates::FileTemplateStore;
use notifyhub::test_utils::RecordingMailTransport;
use notifyhub::{Channel, Message};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn every_marker() -> String {
    VOCABULARY
        .iter()
        .map(|name| format!("[{{{{{}}}}}]", name))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_no_marker_survives_rendering() {
    let template = format!("{} {{{{unknown}}}} {{{{plan}}}}", every_marker());
    let messages = vec![
        Message::default(),
        Message::new("t", "b"),
        detection_message(),
        {
            let mut m = detection_message();
            m.media.clear();
            m.timezone = Some("Not/AZone".to_string());
            m.body = "{{user}} {{{{nested}}}}".to_string();
            m
        },
    ];

    for message in &messages {
        let rendered = render(&template, message);
        assert!(
            !rendered.contains("{{"),
            "unresolved marker in {:?}",
            rendered
        );
        assert_eq!(rendered, render(&template, message));
    }
}

#[test]
fn test_detection_message_renders_every_field() {
    let message = detection_message();

    assert_eq!(
        render("{{user}} / {{text}} / {{link}}", &message),
        "alice / Someone is at the front door / https://cdn.example.com/clip.mp4"
    );
    assert_eq!(
        render("{{classifications}} | {{sites}} | {{groups}}", &message),
        "person, car | Home | Family, Neighbours"
    );
    assert_eq!(
        render("{{deviceid}} {{devicename}} {{timezone}}", &message),
        "cam-1 Front door Europe/Brussels"
    );
    assert_eq!(render("{{eventdatetime}}", &message), "2023-11-14 23:13:20");
    assert_eq!(render("{{datetime}}", &message), "2023-11-14 23:13:10");
    assert_eq!(render("{{plan}}", &message), "premium");
}

#[test]
fn test_inline_thumbnail_wins_over_media_thumbnail() {
    let mut message = detection_message();
    message.thumbnail = Some("aGVsbG8=".to_string());

    let rendered = render("{{thumbnail}}", &message);

    assert!(rendered.contains("data:image/jpeg;base64,aGVsbG8="));
    assert!(!rendered.contains("clip.jpg"));
}

#[tokio::test]
async fn test_smtp_renders_file_templates() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("detection.html"),
        "<h1>{{text}}</h1><a href='{{link}}'>watch</a>",
    )
    .unwrap();
    fs::write(dir.path().join("detection.txt"), "{{text}} ({{sites}})").unwrap();

    let options = SmtpOptions {
        server: "smtp.example.com".into(),
        port: 587,
        username: "mailer".into(),
        password: "secret".into(),
        email_from: "alerts@example.com".into(),
        email_to: "ops@example.com".into(),
        template_id: Some("detection".into()),
        timeout_secs: None,
    };
    let transport = Arc::new(RecordingMailTransport::new());
    let channel = SmtpChannel::new(options, Arc::new(FileTemplateStore::new(dir.path())))
        .unwrap()
        .with_transport(transport.clone());

    channel.send(&detection_message()).await.unwrap();

    assert_eq!(transport.calls(), 1);
    let raw = &transport.formatted()[0];
    assert!(raw.contains("Subject: Motion detected"));
    assert!(raw.contains("<h1>Someone is at the front door</h1>"));
    assert!(raw.contains("Someone is at the front door (Home)"));
    assert!(!raw.contains("{{"));
}
