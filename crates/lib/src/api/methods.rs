//! Typed Bot API methods over an [`ApiClient`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::client::ApiClient;
use super::error::ApiError;
use crate::inline::InlineQueryResults;
use crate::keyboard::InlineKeyboard;
use crate::types::{Chat, Message, Update, UpdateType, User, WebhookInfo};

/// Numeric chat id or `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

impl From<&str> for ChatId {
    fn from(username: &str) -> Self {
        ChatId::Username(username.to_string())
    }
}

impl From<String> for ChatId {
    fn from(username: String) -> Self {
        ChatId::Username(username)
    }
}

/// Message addressed by an edit call.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageTarget {
    Chat { chat_id: ChatId, message_id: i64 },
    /// Message sent via inline mode.
    Inline(String),
}

impl MessageTarget {
    fn write_to(&self, params: &mut Value) {
        match self {
            MessageTarget::Chat {
                chat_id,
                message_id,
            } => {
                params["chat_id"] = json!(chat_id);
                params["message_id"] = json!(message_id);
            }
            MessageTarget::Inline(id) => {
                params["inline_message_id"] = json!(id);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordVoice,
    UploadVoice,
    UploadDocument,
    ChooseSticker,
    FindLocation,
}

impl ChatAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatAction::Typing => "typing",
            ChatAction::UploadPhoto => "upload_photo",
            ChatAction::RecordVideo => "record_video",
            ChatAction::UploadVideo => "upload_video",
            ChatAction::RecordVoice => "record_voice",
            ChatAction::UploadVoice => "upload_voice",
            ChatAction::UploadDocument => "upload_document",
            ChatAction::ChooseSticker => "choose_sticker",
            ChatAction::FindLocation => "find_location",
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

fn set_opt<T: Serialize>(params: &mut Value, key: &str, value: Option<T>) {
    if let Some(v) = value {
        params[key] = json!(v);
    }
}

/// Bot API methods. Cheap to clone; `parse_mode` is applied to text and captions.
#[derive(Clone)]
pub struct Api {
    client: Arc<dyn ApiClient>,
    parse_mode: Option<String>,
}

impl Api {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            parse_mode: None,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: Option<String>) -> Self {
        self.parse_mode = parse_mode.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn parse_mode(&self) -> Option<&str> {
        self.parse_mode.as_deref()
    }

    /// Raw method call for anything not wrapped below.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        log::debug!("telegram call {}", method);
        self.client.call(method, params).await
    }

    fn text_params(&self, params: &mut Value, keyboard: Option<&InlineKeyboard>) {
        set_opt(params, "parse_mode", self.parse_mode.as_deref());
        set_opt(
            params,
            "reply_markup",
            keyboard.filter(|kb| !kb.is_empty()).map(InlineKeyboard::to_reply_markup),
        );
    }

    pub async fn get_me(&self) -> Result<User, ApiError> {
        decode(self.call("getMe", json!({})).await?)
    }

    /// Long-poll for updates. Items that fail to decode are kept as updates without
    /// a payload so the cursor can move past them.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        limit: u32,
        timeout: u64,
    ) -> Result<Vec<Update>, ApiError> {
        let mut params = json!({ "limit": limit, "timeout": timeout });
        set_opt(&mut params, "offset", offset);
        let items: Vec<Value> = decode(self.call("getUpdates", params).await?)?;
        let mut updates = Vec::with_capacity(items.len());
        for item in items {
            match Update::from_value_lenient(item) {
                Ok(u) => updates.push(u),
                Err(e) => log::warn!("dropping update without update_id: {}", e),
            }
        }
        Ok(updates)
    }

    /// Register `url` as webhook. `secret` is echoed back by Telegram in the
    /// `X-Telegram-Bot-Api-Secret-Token` header.
    pub async fn set_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
        allowed_updates: Option<&[UpdateType]>,
        max_connections: Option<u32>,
    ) -> Result<bool, ApiError> {
        let mut params = json!({ "url": url });
        set_opt(&mut params, "secret_token", secret);
        set_opt(&mut params, "max_connections", max_connections);
        set_opt(
            &mut params,
            "allowed_updates",
            allowed_updates.map(|types| types.iter().map(UpdateType::as_str).collect::<Vec<_>>()),
        );
        decode(self.call("setWebhook", params).await?)
    }

    /// Remove the webhook so getUpdates works again.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, ApiError> {
        decode(
            self.call(
                "deleteWebhook",
                json!({ "drop_pending_updates": drop_pending_updates }),
            )
            .await?,
        )
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, ApiError> {
        decode(self.call("getWebhookInfo", json!({})).await?)
    }

    pub async fn send_message(
        &self,
        chat_id: impl Into<ChatId>,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError> {
        let mut params = json!({ "chat_id": chat_id.into(), "text": text });
        self.text_params(&mut params, keyboard);
        decode(self.call("sendMessage", params).await?)
    }

    pub async fn forward_message(
        &self,
        chat_id: impl Into<ChatId>,
        from_chat_id: impl Into<ChatId>,
        message_id: i64,
    ) -> Result<Message, ApiError> {
        let params = json!({
            "chat_id": chat_id.into(),
            "from_chat_id": from_chat_id.into(),
            "message_id": message_id,
        });
        decode(self.call("forwardMessage", params).await?)
    }

    /// `photo` is a file_id already on Telegram's servers or an HTTP URL.
    pub async fn send_photo(
        &self,
        chat_id: impl Into<ChatId>,
        photo: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError> {
        let mut params = json!({ "chat_id": chat_id.into(), "photo": photo });
        set_opt(&mut params, "caption", caption);
        self.text_params(&mut params, keyboard);
        decode(self.call("sendPhoto", params).await?)
    }

    pub async fn send_document(
        &self,
        chat_id: impl Into<ChatId>,
        document: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, ApiError> {
        let mut params = json!({ "chat_id": chat_id.into(), "document": document });
        set_opt(&mut params, "caption", caption);
        self.text_params(&mut params, keyboard);
        decode(self.call("sendDocument", params).await?)
    }

    pub async fn send_sticker(
        &self,
        chat_id: impl Into<ChatId>,
        sticker: &str,
    ) -> Result<Message, ApiError> {
        let params = json!({ "chat_id": chat_id.into(), "sticker": sticker });
        decode(self.call("sendSticker", params).await?)
    }

    pub async fn send_location(
        &self,
        chat_id: impl Into<ChatId>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Message, ApiError> {
        let params = json!({
            "chat_id": chat_id.into(),
            "latitude": latitude,
            "longitude": longitude,
        });
        decode(self.call("sendLocation", params).await?)
    }

    pub async fn send_chat_action(
        &self,
        chat_id: impl Into<ChatId>,
        action: ChatAction,
    ) -> Result<bool, ApiError> {
        let params = json!({ "chat_id": chat_id.into(), "action": action.as_str() });
        decode(self.call("sendChatAction", params).await?)
    }

    /// Returns the edited message, or `true` for inline messages.
    pub async fn edit_message_text(
        &self,
        target: &MessageTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Value, ApiError> {
        let mut params = json!({ "text": text });
        target.write_to(&mut params);
        self.text_params(&mut params, keyboard);
        self.call("editMessageText", params).await
    }

    pub async fn edit_message_caption(
        &self,
        target: &MessageTarget,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Value, ApiError> {
        let mut params = json!({ "caption": caption });
        target.write_to(&mut params);
        self.text_params(&mut params, keyboard);
        self.call("editMessageCaption", params).await
    }

    /// `None` removes the keyboard.
    pub async fn edit_message_reply_markup(
        &self,
        target: &MessageTarget,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Value, ApiError> {
        let mut params = json!({});
        target.write_to(&mut params);
        params["reply_markup"] = keyboard
            .map(InlineKeyboard::to_reply_markup)
            .unwrap_or_else(|| json!({ "inline_keyboard": [] }));
        self.call("editMessageReplyMarkup", params).await
    }

    pub async fn delete_message(
        &self,
        chat_id: impl Into<ChatId>,
        message_id: i64,
    ) -> Result<bool, ApiError> {
        let params = json!({ "chat_id": chat_id.into(), "message_id": message_id });
        decode(self.call("deleteMessage", params).await?)
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<bool, ApiError> {
        let mut params = json!({
            "callback_query_id": callback_query_id,
            "show_alert": show_alert,
        });
        set_opt(&mut params, "text", text);
        decode(self.call("answerCallbackQuery", params).await?)
    }

    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        results: &InlineQueryResults,
        cache_time: Option<u32>,
        is_personal: bool,
        next_offset: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut params = json!({
            "inline_query_id": inline_query_id,
            "results": results.to_json(),
            "is_personal": is_personal,
        });
        set_opt(&mut params, "cache_time", cache_time);
        set_opt(&mut params, "next_offset", next_offset);
        decode(self.call("answerInlineQuery", params).await?)
    }

    pub async fn answer_pre_checkout_query(
        &self,
        pre_checkout_query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut params = json!({ "pre_checkout_query_id": pre_checkout_query_id, "ok": ok });
        set_opt(&mut params, "error_message", error_message);
        decode(self.call("answerPreCheckoutQuery", params).await?)
    }

    /// `shipping_options` is required by Telegram when `ok` is true.
    pub async fn answer_shipping_query(
        &self,
        shipping_query_id: &str,
        ok: bool,
        shipping_options: Option<Value>,
        error_message: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut params = json!({ "shipping_query_id": shipping_query_id, "ok": ok });
        set_opt(&mut params, "shipping_options", shipping_options);
        set_opt(&mut params, "error_message", error_message);
        decode(self.call("answerShippingQuery", params).await?)
    }

    pub async fn get_chat(&self, chat_id: impl Into<ChatId>) -> Result<Chat, ApiError> {
        decode(self.call("getChat", json!({ "chat_id": chat_id.into() })).await?)
    }

    pub async fn get_chat_administrators(
        &self,
        chat_id: impl Into<ChatId>,
    ) -> Result<Vec<Value>, ApiError> {
        decode(
            self.call("getChatAdministrators", json!({ "chat_id": chat_id.into() }))
                .await?,
        )
    }

    pub async fn get_chat_member(
        &self,
        chat_id: impl Into<ChatId>,
        user_id: i64,
    ) -> Result<Value, ApiError> {
        self.call(
            "getChatMember",
            json!({ "chat_id": chat_id.into(), "user_id": user_id }),
        )
        .await
    }

    pub async fn get_chat_members_count(&self, chat_id: impl Into<ChatId>) -> Result<i64, ApiError> {
        decode(
            self.call("getChatMemberCount", json!({ "chat_id": chat_id.into() }))
                .await?,
        )
    }

    pub async fn leave_chat(&self, chat_id: impl Into<ChatId>) -> Result<bool, ApiError> {
        decode(self.call("leaveChat", json!({ "chat_id": chat_id.into() })).await?)
    }

    /// `until_date` is a unix timestamp; omitted means forever.
    pub async fn ban_chat_member(
        &self,
        chat_id: impl Into<ChatId>,
        user_id: i64,
        until_date: Option<i64>,
    ) -> Result<bool, ApiError> {
        let mut params = json!({ "chat_id": chat_id.into(), "user_id": user_id });
        set_opt(&mut params, "until_date", until_date);
        decode(self.call("banChatMember", params).await?)
    }

    pub async fn unban_chat_member(
        &self,
        chat_id: impl Into<ChatId>,
        user_id: i64,
    ) -> Result<bool, ApiError> {
        let params = json!({
            "chat_id": chat_id.into(),
            "user_id": user_id,
            "only_if_banned": true,
        });
        decode(self.call("unbanChatMember", params).await?)
    }

    /// File metadata; download from `{base}/file/bot{token}/{file_path}`.
    pub async fn get_file(&self, file_id: &str) -> Result<Value, ApiError> {
        self.call("getFile", json!({ "file_id": file_id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingClient;

    #[tokio::test]
    async fn send_message_carries_parse_mode_and_markup() {
        let client = Arc::new(RecordingClient::new());
        let api = Api::new(client.clone()).with_parse_mode(Some("HTML".to_string()));
        let mut kb = InlineKeyboard::new();
        kb.add_button("Next", "list/2");
        let msg = api
            .send_message(42, "<b>hi</b>", Some(&kb))
            .await
            .expect("sent");
        assert_eq!(msg.chat.id, 42);

        let (method, params) = client.last_call().expect("call");
        assert_eq!(method, "sendMessage");
        assert_eq!(params["parse_mode"], "HTML");
        assert_eq!(params["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "list/2");
    }

    #[tokio::test]
    async fn empty_keyboard_is_omitted_and_username_chat_ids_pass_through() {
        let client = Arc::new(RecordingClient::new());
        let api = Api::new(client.clone());
        api.send_message("@news", "hello", Some(&InlineKeyboard::new()))
            .await
            .expect("sent");
        let (_, params) = client.last_call().expect("call");
        assert_eq!(params["chat_id"], "@news");
        assert!(params.get("reply_markup").is_none());
        assert!(params.get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn edit_targets_inline_or_chat_message() {
        let client = Arc::new(RecordingClient::new());
        let api = Api::new(client.clone());
        api.edit_message_text(&MessageTarget::Inline("abc".into()), "x", None)
            .await
            .expect("edited");
        let (_, params) = client.last_call().expect("call");
        assert_eq!(params["inline_message_id"], "abc");
        assert!(params.get("chat_id").is_none());

        let target = MessageTarget::Chat {
            chat_id: ChatId::Id(5),
            message_id: 9,
        };
        api.edit_message_reply_markup(&target, None).await.expect("edited");
        let (method, params) = client.last_call().expect("call");
        assert_eq!(method, "editMessageReplyMarkup");
        assert_eq!(params["message_id"], 9);
        assert_eq!(params["reply_markup"], json!({ "inline_keyboard": [] }));
    }

    #[tokio::test]
    async fn get_updates_keeps_undecodable_items() {
        let client = Arc::new(RecordingClient::new());
        client.respond(
            "getUpdates",
            json!([
                { "update_id": 10, "message": { "message_id": 1, "chat": { "id": 3, "type": "private" }, "date": 0 } },
                { "update_id": 11, "message": { "chat": "broken" } },
                { "no_id": true }
            ]),
        );
        let api = Api::new(client.clone());
        let updates = api.get_updates(Some(10), 100, 0).await.expect("updates");
        assert_eq!(updates.len(), 2);
        assert!(updates[0].kind.is_some());
        assert_eq!(updates[1], Update::unknown(11));
        let (_, params) = client.last_call().expect("call");
        assert_eq!(params["offset"], 10);
    }
}
