#![allow(dead_code)]

pub mod mock_backend;

use notifyhub::core::{Media, Message, NamedEntity};
use std::io::Write;
use tempfile::NamedTempFile;

/// A fully populated message, as a camera detection event would produce it.
pub fn detection_message() -> Message {
    let mut message = Message::new("Motion detected", "Someone is at the front door");
    message.kind = "detection".to_string();
    message.user = "alice".to_string();
    message.user_id = "user-1".to_string();
    message.email = "alice@example.com".to_string();
    message.timestamp = 1_700_000_000;
    message.timezone = Some("Europe/Brussels".to_string());
    message.classifications = vec!["person".to_string(), "car".to_string()];
    message.sites = vec![NamedEntity::new("Home")];
    message.groups = vec![NamedEntity::new("Family"), NamedEntity::new("Neighbours")];
    message.device_id = Some("cam-1".to_string());
    message.device_name = Some("Front door".to_string());
    message.media = vec![Media {
        url: "https://cdn.example.com/clip.mp4".to_string(),
        thumbnail_url: "https://cdn.example.com/clip.jpg".to_string(),
        start_timestamp: 1_699_999_990,
        media_type: "video".to_string(),
    }];
    message
        .data
        .insert("plan".to_string(), "premium".to_string());
    message
}

/// Writes `contents` to a temporary file that lives as long as the handle.
pub fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}
