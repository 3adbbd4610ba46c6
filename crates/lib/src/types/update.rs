//! Update: one event from Telegram, decoded into a tagged union.
//!
//! The payload key is resolved once, at decode time, in a fixed priority order.
//! An update carrying none of the known keys decodes with `kind: None`.

use serde::Deserialize;
use serde_json::Value;

use super::payload::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, PreCheckoutQuery, ShippingQuery,
};

/// Payload-less tag of an update variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateType {
    Message,
    CallbackQuery,
    InlineQuery,
    ChannelPost,
    EditedMessage,
    EditedChannelPost,
    ChosenInlineResult,
    PreCheckoutQuery,
    ShippingQuery,
}

impl UpdateType {
    /// All variants in key-resolution priority order.
    pub const ALL: [UpdateType; 9] = [
        UpdateType::Message,
        UpdateType::CallbackQuery,
        UpdateType::InlineQuery,
        UpdateType::ChannelPost,
        UpdateType::EditedMessage,
        UpdateType::EditedChannelPost,
        UpdateType::ChosenInlineResult,
        UpdateType::PreCheckoutQuery,
        UpdateType::ShippingQuery,
    ];

    /// JSON key of this variant in the Bot API `Update` object.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Message => "message",
            UpdateType::CallbackQuery => "callback_query",
            UpdateType::InlineQuery => "inline_query",
            UpdateType::ChannelPost => "channel_post",
            UpdateType::EditedMessage => "edited_message",
            UpdateType::EditedChannelPost => "edited_channel_post",
            UpdateType::ChosenInlineResult => "chosen_inline_result",
            UpdateType::PreCheckoutQuery => "pre_checkout_query",
            UpdateType::ShippingQuery => "shipping_query",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    Message(Message),
    CallbackQuery(CallbackQuery),
    InlineQuery(InlineQuery),
    ChannelPost(Message),
    EditedMessage(Message),
    EditedChannelPost(Message),
    ChosenInlineResult(ChosenInlineResult),
    PreCheckoutQuery(PreCheckoutQuery),
    ShippingQuery(ShippingQuery),
}

impl UpdateKind {
    pub fn update_type(&self) -> UpdateType {
        match self {
            UpdateKind::Message(_) => UpdateType::Message,
            UpdateKind::CallbackQuery(_) => UpdateType::CallbackQuery,
            UpdateKind::InlineQuery(_) => UpdateType::InlineQuery,
            UpdateKind::ChannelPost(_) => UpdateType::ChannelPost,
            UpdateKind::EditedMessage(_) => UpdateType::EditedMessage,
            UpdateKind::EditedChannelPost(_) => UpdateType::EditedChannelPost,
            UpdateKind::ChosenInlineResult(_) => UpdateType::ChosenInlineResult,
            UpdateKind::PreCheckoutQuery(_) => UpdateType::PreCheckoutQuery,
            UpdateKind::ShippingQuery(_) => UpdateType::ShippingQuery,
        }
    }

    /// The message for any of the four message-shaped variants.
    pub fn message(&self) -> Option<&Message> {
        match self {
            UpdateKind::Message(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::EditedChannelPost(m) => Some(m),
            _ => None,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match self {
            UpdateKind::CallbackQuery(q) => Some(q),
            _ => None,
        }
    }

    pub fn inline_query(&self) -> Option<&InlineQuery> {
        match self {
            UpdateKind::InlineQuery(q) => Some(q),
            _ => None,
        }
    }

    pub fn chosen_inline_result(&self) -> Option<&ChosenInlineResult> {
        match self {
            UpdateKind::ChosenInlineResult(r) => Some(r),
            _ => None,
        }
    }

    pub fn pre_checkout_query(&self) -> Option<&PreCheckoutQuery> {
        match self {
            UpdateKind::PreCheckoutQuery(q) => Some(q),
            _ => None,
        }
    }

    pub fn shipping_query(&self) -> Option<&ShippingQuery> {
        match self {
            UpdateKind::ShippingQuery(q) => Some(q),
            _ => None,
        }
    }
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawUpdate")]
pub struct Update {
    pub update_id: i64,
    pub kind: Option<UpdateKind>,
}

impl Update {
    pub fn new(update_id: i64, kind: UpdateKind) -> Self {
        Self {
            update_id,
            kind: Some(kind),
        }
    }

    /// An update whose payload could not be recognised; dispatch skips it.
    pub fn unknown(update_id: i64) -> Self {
        Self {
            update_id,
            kind: None,
        }
    }

    pub fn update_type(&self) -> Option<UpdateType> {
        self.kind.as_ref().map(UpdateKind::update_type)
    }

    /// Decode one update. A malformed payload still yields [`Update::unknown`] so the
    /// update can be acknowledged; only a missing or non-integer `update_id` fails.
    pub fn from_value_lenient(value: Value) -> Result<Self, serde_json::Error> {
        let update_id = value.get("update_id").and_then(Value::as_i64);
        match serde_json::from_value::<Update>(value) {
            Ok(u) => Ok(u),
            Err(e) => match update_id {
                Some(id) => {
                    log::warn!("update {}: could not decode payload: {}", id, e);
                    Ok(Update::unknown(id))
                }
                None => Err(e),
            },
        }
    }
}

#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
    #[serde(default)]
    inline_query: Option<InlineQuery>,
    #[serde(default)]
    channel_post: Option<Message>,
    #[serde(default)]
    edited_message: Option<Message>,
    #[serde(default)]
    edited_channel_post: Option<Message>,
    #[serde(default)]
    chosen_inline_result: Option<ChosenInlineResult>,
    #[serde(default)]
    pre_checkout_query: Option<PreCheckoutQuery>,
    #[serde(default)]
    shipping_query: Option<ShippingQuery>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let kind = raw
            .message
            .map(UpdateKind::Message)
            .or_else(|| raw.callback_query.map(UpdateKind::CallbackQuery))
            .or_else(|| raw.inline_query.map(UpdateKind::InlineQuery))
            .or_else(|| raw.channel_post.map(UpdateKind::ChannelPost))
            .or_else(|| raw.edited_message.map(UpdateKind::EditedMessage))
            .or_else(|| raw.edited_channel_post.map(UpdateKind::EditedChannelPost))
            .or_else(|| raw.chosen_inline_result.map(UpdateKind::ChosenInlineResult))
            .or_else(|| raw.pre_checkout_query.map(UpdateKind::PreCheckoutQuery))
            .or_else(|| raw.shipping_query.map(UpdateKind::ShippingQuery));
        Self {
            update_id: raw.update_id,
            kind,
        }
    }
}
