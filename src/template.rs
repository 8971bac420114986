//! Placeholder substitution for notification templates.
//!
//! Templates use `{{name}}` markers. A fixed vocabulary is resolved from the
//! message fields first, then any remaining marker is looked up in
//! `Message::data`. Markers that resolve to nothing are removed, so rendered
//! text never carries a literal `{{...}}` token.
//!
//! | marker | source |
//! |---|---|
//! | `{{user}}` | `user`, else `data["user"]` |
//! | `{{text}}` | `body` |
//! | `{{link}}` | `media[0].url`, else `data["link"]` |
//! | `{{thumbnail}}` | inline `thumbnail`, else `media[0].thumbnail_url` |
//! | `{{classifications}}` | classifications joined with ", " |
//! | `{{date}}` `{{time}}` `{{datetime}}` | `media[0].start_timestamp` |
//! | `{{eventdate}}` `{{eventtime}}` `{{eventdatetime}}` | `timestamp` |
//! | `{{timezone}}` | `timezone` |
//! | `{{deviceid}}` `{{devicename}}` | device fields |
//! | `{{sites}}` `{{groups}}` | entity names joined with ", " |
//! | `{{numberOfMedia}}` `{{dataUsage}}` | quota fields |

use crate::core::{Message, NamedEntity};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::warn;

/// Every marker name the engine resolves from message fields.
pub const VOCABULARY: &[&str] = &[
    "user",
    "text",
    "link",
    "thumbnail",
    "classifications",
    "date",
    "time",
    "datetime",
    "eventdate",
    "eventtime",
    "eventdatetime",
    "timezone",
    "deviceid",
    "devicename",
    "sites",
    "groups",
    "numberOfMedia",
    "dataUsage",
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is valid"));

/// Renders `template` against `message`.
pub fn render(template: &str, message: &Message) -> String {
    let fields = Fields::new(message);
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        fields
            .resolve(name)
            .or_else(|| message.data_value(name).map(str::to_string))
            .unwrap_or_default()
    });
    strip_placeholders(&rendered)
}

/// Resolves the whole vocabulary plus `data` into a variable map, for
/// backends that render templates on their side.
///
/// Fixed names take precedence over `data` entries with the same key.
pub fn variables(message: &Message) -> BTreeMap<String, String> {
    let fields = Fields::new(message);
    let mut vars: BTreeMap<String, String> = VOCABULARY
        .iter()
        .filter_map(|name| fields.resolve(name).map(|v| (name.to_string(), v)))
        .collect();
    for (key, value) in &message.data {
        vars.entry(key.clone()).or_insert_with(|| value.clone());
    }
    vars
}

/// Removes every `{{...}}` marker, including ones that only appear once an
/// inner marker is removed.
pub fn strip_placeholders(text: &str) -> String {
    let mut out = text.to_string();
    while PLACEHOLDER.is_match(&out) {
        out = PLACEHOLDER.replace_all(&out, "").into_owned();
    }
    out
}

/// Message fields precomputed once per render.
struct Fields<'a> {
    message: &'a Message,
    media_time: Option<DateTime<Tz>>,
    event_time: Option<DateTime<Tz>>,
}

impl<'a> Fields<'a> {
    fn new(message: &'a Message) -> Self {
        let zone = display_zone(message);
        let media_time = message
            .primary_media()
            .map(|m| m.start_timestamp)
            .and_then(|ts| to_zoned(ts, zone));
        let event_time = to_zoned(message.timestamp, zone);
        Self {
            message,
            media_time,
            event_time,
        }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        let m = self.message;
        match name {
            "user" => non_empty(&m.user).or_else(|| m.data_value("user").map(str::to_string)),
            "text" => Some(m.body.clone()),
            "link" => non_empty(m.primary_link())
                .or_else(|| m.data_value("link").map(str::to_string)),
            "thumbnail" => self.thumbnail(),
            "classifications" => join_non_empty(m.classifications.iter()),
            "date" => format_time(self.media_time, DATE_FORMAT),
            "time" => format_time(self.media_time, TIME_FORMAT),
            "datetime" => format_time(self.media_time, DATETIME_FORMAT),
            "eventdate" => format_time(self.event_time, DATE_FORMAT),
            "eventtime" => format_time(self.event_time, TIME_FORMAT),
            "eventdatetime" => format_time(self.event_time, DATETIME_FORMAT),
            "timezone" => non_empty_opt(&m.timezone),
            "deviceid" => non_empty_opt(&m.device_id),
            "devicename" => non_empty_opt(&m.device_name),
            "sites" => join_names(&m.sites),
            "groups" => join_names(&m.groups),
            "numberOfMedia" => non_empty_opt(&m.number_of_media),
            "dataUsage" => non_empty_opt(&m.data_usage),
            _ => None,
        }
    }

    /// The inline thumbnail always wins over the media thumbnail URL.
    fn thumbnail(&self) -> Option<String> {
        if let Some(inline) = self.message.thumbnail.as_deref().filter(|t| !t.is_empty()) {
            let src = if inline.starts_with("data:") {
                inline.to_string()
            } else {
                format!("data:image/jpeg;base64,{}", inline)
            };
            return Some(image_tag(&src));
        }
        self.message
            .primary_media()
            .map(|m| m.thumbnail_url.as_str())
            .filter(|url| !url.is_empty())
            .map(image_tag)
    }
}

fn image_tag(src: &str) -> String {
    format!("<img src='{}' width='400px' height='auto' />", src)
}

/// The zone dates are shown in. Unknown zone names fall back to UTC so the
/// timestamp is shown as-is.
fn display_zone(message: &Message) -> Tz {
    match message.timezone.as_deref().filter(|tz| !tz.is_empty()) {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(timezone = name, "Unknown timezone, rendering dates in UTC");
                Tz::UTC
            }
        },
        None => Tz::UTC,
    }
}

fn to_zoned(timestamp: i64, zone: Tz) -> Option<DateTime<Tz>> {
    if timestamp <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|t| t.with_timezone(&zone))
}

fn format_time(time: Option<DateTime<Tz>>, format: &str) -> Option<String> {
    time.map(|t| t.format(format).to_string())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

fn join_non_empty<'s>(values: impl Iterator<Item = &'s String>) -> Option<String> {
    non_empty(&values.filter(|v| !v.is_empty()).join(", "))
}

fn join_names(entities: &[NamedEntity]) -> Option<String> {
    join_non_empty(entities.iter().map(|e| &e.name))
}
