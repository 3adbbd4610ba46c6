//! Bot API payload objects carried inside updates (only the fields routing and handlers use).

use serde::{Deserialize, Serialize};

/// Entity type Telegram uses for `/command` tokens.
pub const BOT_COMMAND_ENTITY: &str = "bot_command";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl User {
    /// First and last name joined by a space.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

/// A span of special text in a message. `offset` and `length` count UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl MessageEntity {
    pub fn is_bot_command(&self) -> bool {
        self.kind == BOT_COMMAND_ENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First `bot_command` entity, wherever it appears in the entity list.
    pub fn command_entity(&self) -> Option<&MessageEntity> {
        self.entities.iter().find(|e| e.is_bot_command())
    }

    /// Text covered by `entity`, or None when the entity points outside the text.
    pub fn entity_text(&self, entity: &MessageEntity) -> Option<String> {
        utf16_slice(self.text.as_deref()?, entity.offset, entity.length)
    }

    /// Text following the first `bot_command` entity, trimmed. Empty string when the
    /// command has no arguments; None when the message has no command.
    pub fn command_arguments(&self) -> Option<String> {
        let entity = self.command_entity()?;
        let text = self.text.as_deref()?;
        let units: Vec<u16> = text.encode_utf16().collect();
        let start = entity.offset.checked_add(entity.length)?;
        let rest = units.get(start..)?;
        Some(String::from_utf16_lossy(rest).trim().to_string())
    }
}

/// Slice `text` by UTF-16 code units, the way Telegram measures entity offsets.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = offset.checked_add(length)?;
    let slice = units.get(offset..end)?;
    String::from_utf16(slice).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub chat_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub total_amount: i64,
    #[serde(default)]
    pub invoice_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_option_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub country_code: String,
    #[serde(default)]
    pub state: String,
    pub city: String,
    pub street_line1: String,
    #[serde(default)]
    pub street_line2: String,
    pub post_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub invoice_payload: String,
    pub shipping_address: ShippingAddress,
}

/// Result of getWebhookInfo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub has_custom_certificate: bool,
    #[serde(default)]
    pub pending_update_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(text: &str, entities: serde_json::Value) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "chat": { "id": 42, "type": "private" },
            "date": 0,
            "text": text,
            "entities": entities,
        }))
        .expect("valid message")
    }

    #[test]
    fn utf16_slice_counts_surrogate_pairs() {
        // The emoji is two UTF-16 units, so the command starts at offset 3.
        let text = "😀 /start";
        assert_eq!(utf16_slice(text, 3, 6).as_deref(), Some("/start"));
        assert_eq!(utf16_slice(text, 3, 60), None);
    }

    #[test]
    fn command_arguments_follow_entity() {
        let m = message(
            "/roll 2d6 please",
            json!([{ "type": "bot_command", "offset": 0, "length": 5 }]),
        );
        assert_eq!(m.command_arguments().as_deref(), Some("2d6 please"));
        let e = m.command_entity().expect("entity");
        assert_eq!(m.entity_text(e).as_deref(), Some("/roll"));
    }

    #[test]
    fn command_entity_skips_other_entities() {
        let m = message(
            "@friend /help",
            json!([
                { "type": "mention", "offset": 0, "length": 7 },
                { "type": "bot_command", "offset": 8, "length": 5 }
            ]),
        );
        assert_eq!(m.command_entity().map(|e| e.offset), Some(8));
        assert!(m.chat.is_private());
    }
}
