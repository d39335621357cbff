//! VK wire formats: keyboards, carousel templates and long poll events.

use serde::{Deserialize, Deserializer, Serialize};

use crate::keyboard::{Button, Card, Color, Keyboard};

#[derive(Debug, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VkButton {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VkKeyboard {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub one_time: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
    pub buttons: Vec<Vec<VkButton>>,
}

#[derive(Debug, Serialize)]
pub struct CarouselElement {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<String>,
    pub action: Action,
    pub buttons: Vec<VkButton>,
}

#[derive(Debug, Serialize)]
pub struct Carousel {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub elements: Vec<CarouselElement>,
}

/// `{"command": "..."}`, the payload every bot button carries.
pub fn payload(command: &str) -> String {
    serde_json::json!({ "command": command }).to_string()
}

/// `kind` is `callback` for buttons answered with an event and `text` for
/// buttons that post a message.
fn button(button: &Button, kind: &'static str) -> VkButton {
    VkButton {
        action: Action {
            kind,
            label: Some(button.label.clone()),
            link: None,
            payload: Some(payload(&button.command)),
        },
        color: button.color.map(|c| match c {
            Color::Primary => "primary",
        }),
    }
}

impl VkKeyboard {
    /// An empty grid becomes a one-time keyboard without buttons, which is
    /// how VK hides the current keyboard.
    pub fn from_keyboard(keyboard: &Keyboard) -> Self {
        Self {
            one_time: keyboard.is_empty(),
            inline: keyboard.inline,
            buttons: keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(|b| button(b, "callback")).collect())
                .collect(),
        }
    }
}

impl Carousel {
    pub fn single(card: &Card, photo_id: Option<String>) -> Self {
        Self {
            kind: "carousel",
            elements: vec![CarouselElement {
                title: card.title.clone(),
                description: card.description.clone(),
                photo_id,
                action: Action {
                    kind: "open_link",
                    label: None,
                    link: Some(card.link.clone()),
                    payload: None,
                },
                buttons: card.buttons.iter().map(|b| button(b, "text")).collect(),
            }],
        }
    }
}

/// Long poll `ts` arrives as a string from some endpoints and a number
/// from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct LongPollServer {
    pub key: String,
    pub server: String,
    #[serde(deserialize_with = "string_or_number")]
    pub ts: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PollResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub ts: Option<String>,
    #[serde(default)]
    pub updates: Vec<Update>,
    pub failed: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct MessageNew {
    pub message: IncomingMessage,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: i64,
    /// Unix time.
    pub date: i64,
    pub peer_id: i64,
    #[serde(default)]
    pub from_id: i64,
    #[serde(default)]
    pub text: String,
    pub payload: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    pub user_id: i64,
    pub peer_id: i64,
    pub event_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}
