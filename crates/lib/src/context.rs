//! Per-update dispatch context.

use crate::types::{UpdateKind, UpdateType};

/// Ids extracted from the update being dispatched. Built fresh for every update and
/// handed to the handler; the bot itself keeps no per-update state.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchContext {
    pub update_id: i64,
    pub update_type: UpdateType,
    /// Chat the update belongs to; for queries without a message, the sender's id.
    pub chat_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Message the update is about (the message itself, or the one a callback button is attached to).
    pub message_id: Option<i64>,
    pub inline_message_id: Option<String>,
    pub callback_query_id: Option<String>,
    pub inline_query_id: Option<String>,
    pub pre_checkout_query_id: Option<String>,
    pub shipping_query_id: Option<String>,
    /// Status value stored for `chat_id` when dispatch started.
    pub status: Option<String>,
}

impl DispatchContext {
    pub fn new(update_id: i64, update_type: UpdateType) -> Self {
        Self {
            update_id,
            update_type,
            chat_id: None,
            user_id: None,
            message_id: None,
            inline_message_id: None,
            callback_query_id: None,
            inline_query_id: None,
            pre_checkout_query_id: None,
            shipping_query_id: None,
            status: None,
        }
    }

    /// Collect the ids `kind` carries. `status` is left empty; the bot fills it from the store.
    pub fn from_update(update_id: i64, kind: &UpdateKind) -> Self {
        let mut ctx = Self::new(update_id, kind.update_type());
        match kind {
            UpdateKind::Message(m)
            | UpdateKind::ChannelPost(m)
            | UpdateKind::EditedMessage(m)
            | UpdateKind::EditedChannelPost(m) => {
                ctx.chat_id = Some(m.chat.id);
                ctx.user_id = m.from.as_ref().map(|u| u.id);
                ctx.message_id = Some(m.message_id);
            }
            UpdateKind::CallbackQuery(q) => {
                ctx.chat_id = Some(q.message.as_ref().map_or(q.from.id, |m| m.chat.id));
                ctx.user_id = Some(q.from.id);
                ctx.message_id = q.message.as_ref().map(|m| m.message_id);
                ctx.inline_message_id = q.inline_message_id.clone();
                ctx.callback_query_id = Some(q.id.clone());
            }
            UpdateKind::InlineQuery(q) => {
                ctx.chat_id = Some(q.from.id);
                ctx.user_id = Some(q.from.id);
                ctx.inline_query_id = Some(q.id.clone());
            }
            UpdateKind::ChosenInlineResult(r) => {
                ctx.chat_id = Some(r.from.id);
                ctx.user_id = Some(r.from.id);
                ctx.inline_message_id = r.inline_message_id.clone();
            }
            UpdateKind::PreCheckoutQuery(q) => {
                ctx.chat_id = Some(q.from.id);
                ctx.user_id = Some(q.from.id);
                ctx.pre_checkout_query_id = Some(q.id.clone());
            }
            UpdateKind::ShippingQuery(q) => {
                ctx.chat_id = Some(q.from.id);
                ctx.user_id = Some(q.from.id);
                ctx.shipping_query_id = Some(q.id.clone());
            }
        }
        ctx
    }
}
