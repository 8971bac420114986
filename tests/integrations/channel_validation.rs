//! Send-time validation never reaches a backend.

use notifyhub::channels::{
    IftttChannel, IftttOptions, MailChannel, MailOptions, PushbulletChannel, PushbulletOptions,
    PushoverChannel, PushoverOptions, PusherChannel, PusherOptions, SlackChannel, SlackOptions,
    SmsChannel, SmsOptions, TelegramChannel, TelegramOptions, WebhookChannel, WebhookOptions,
};
use notifyhub::test_utils::RecordingHttpTransport;
use notifyhub::transport::HttpTransport;
use notifyhub::{Channel, Message, TextChannel};
use std::sync::Arc;

fn empty_message() -> Message {
    let mut message = Message::new("", "");
    message.kind.clear();
    message
}

fn http_channels(transport: Arc<dyn HttpTransport>) -> Vec<Arc<dyn Channel>> {
    vec![
        Arc::new(
            SlackChannel::new(SlackOptions::new("https://hooks.slack.com/x", "bot"))
                .unwrap()
                .with_transport(transport.clone()),
        ),
        Arc::new(
            TelegramChannel::new(TelegramOptions::new("token", "@alerts"))
                .unwrap()
                .with_transport(transport.clone()),
        ),
        Arc::new(
            WebhookChannel::new(WebhookOptions::new("https://example.com/hook"))
                .unwrap()
                .with_transport(transport.clone()),
        ),
        Arc::new(
            MailChannel::new(MailOptions {
                domain: "mg.example.com".into(),
                api_key: "key".into(),
                template_id: "alert".into(),
                email_from: "alerts@example.com".into(),
                ..Default::default()
            })
            .unwrap()
            .with_transport(transport.clone()),
        ),
        Arc::new(
            SmsChannel::new(SmsOptions {
                account_sid: "AC1".into(),
                auth_token: "t".into(),
                from: "+1".into(),
                to: "+2".into(),
                api_url: None,
            })
            .unwrap()
            .with_transport(transport.clone()),
        ),
        Arc::new(
            PushbulletChannel::new(PushbulletOptions {
                api_key: "k".into(),
                api_url: None,
            })
            .unwrap()
            .with_transport(transport.clone()),
        ),
        Arc::new(
            PushoverChannel::new(PushoverOptions {
                api_key: "k".into(),
                send_to: "u".into(),
                api_url: None,
            })
            .unwrap()
            .with_transport(transport.clone()),
        ),
        Arc::new(
            PusherChannel::new(PusherOptions {
                app_id: "1".into(),
                key: "k".into(),
                secret: "s".into(),
                cluster: "eu".into(),
                event: "detection".into(),
                api_url: None,
            })
            .unwrap()
            .with_transport(transport.clone()),
        ),
        Arc::new(
            IftttChannel::new(IftttOptions {
                token: "k".into(),
                api_url: None,
            })
            .unwrap()
            .with_transport(transport),
        ),
    ]
}

#[tokio::test]
async fn test_empty_message_is_rejected_by_every_http_channel() {
    let transport = Arc::new(RecordingHttpTransport::new());
    let channels = http_channels(transport.clone());
    let message = empty_message();

    for channel in &channels {
        let err = channel.send(&message).await.unwrap_err();
        assert!(
            err.is_validation(),
            "{} returned {:?} instead of a validation error",
            channel.name(),
            err
        );
    }

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_empty_text_is_rejected_by_text_channels() {
    let transport = Arc::new(RecordingHttpTransport::new());
    let slack = SlackChannel::new(SlackOptions::new("https://hooks.slack.com/x", "bot"))
        .unwrap()
        .with_transport(transport.clone());
    let telegram = TelegramChannel::new(TelegramOptions::new("token", "@alerts"))
        .unwrap()
        .with_transport(transport.clone());
    let webhook = WebhookChannel::new(WebhookOptions::new("https://example.com/hook"))
        .unwrap()
        .with_transport(transport.clone());
    let text_channels: Vec<&dyn TextChannel> = vec![&slack, &telegram, &webhook];

    for channel in text_channels {
        assert!(channel
            .send_text("", "http://img")
            .await
            .unwrap_err()
            .is_validation());
    }

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_valid_message_reaches_every_backend_exactly_once() {
    let transport = Arc::new(RecordingHttpTransport::new());
    let channels = http_channels(transport.clone());
    let mut message = Message::new("Motion", "Front door");
    message.email = "alice@example.com".into();
    message.user = "alice".into();

    for channel in &channels {
        channel.send(&message).await.unwrap();
    }

    assert_eq!(transport.calls(), channels.len());
}
