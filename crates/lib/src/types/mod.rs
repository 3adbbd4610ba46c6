//! Telegram Bot API types: updates and the payload objects they carry.

mod payload;
mod update;

pub use payload::{
    utf16_slice, CallbackQuery, Chat, ChosenInlineResult, InlineQuery, Message, MessageEntity,
    PreCheckoutQuery, ShippingAddress, ShippingQuery, User, WebhookInfo, BOT_COMMAND_ENTITY,
};
pub use update::{Update, UpdateKind, UpdateType};
