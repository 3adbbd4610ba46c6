//! Handler type and the `Context` every handler receives.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

use crate::api::{Api, MessageTarget};
use crate::bot::Bot;
use crate::context::DispatchContext;
use crate::inline::InlineQueryResults;
use crate::keyboard::InlineKeyboard;
use crate::store::SessionStore;
use crate::types::Message;

pub type HandlerResult = anyhow::Result<()>;

/// Type-erased async handler for entities of type `E`.
pub type Handler<E> = Arc<dyn Fn(Context, E) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Box a closure or async fn as a [`Handler`].
pub fn handler<E, F, Fut>(f: F) -> Handler<E>
where
    E: Send + 'static,
    F: Fn(Context, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx, entity| f(ctx, entity).boxed())
}

/// What a handler gets besides the entity: the bot and the ids of the current update.
#[derive(Clone)]
pub struct Context {
    bot: Bot,
    dispatch: DispatchContext,
}

impl Context {
    pub fn new(bot: Bot, dispatch: DispatchContext) -> Self {
        Self { bot, dispatch }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn api(&self) -> &Api {
        self.bot.api()
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.bot.store()
    }

    pub fn dispatch(&self) -> &DispatchContext {
        &self.dispatch
    }

    pub fn update_id(&self) -> i64 {
        self.dispatch.update_id
    }

    pub fn chat_id(&self) -> anyhow::Result<i64> {
        require(self.dispatch.chat_id, "chat_id", self.dispatch.update_id)
    }

    /// Send `text` to the current chat.
    pub async fn reply(&self, text: &str) -> anyhow::Result<Message> {
        let chat_id = self.chat_id()?;
        Ok(self.api().send_message(chat_id, text, None).await?)
    }

    pub async fn reply_with_keyboard(
        &self,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> anyhow::Result<Message> {
        let chat_id = self.chat_id()?;
        Ok(self
            .api()
            .send_message(chat_id, text, Some(keyboard))
            .await?)
    }

    /// Edit the message the current update refers to: the chat message a callback
    /// button sits on, or the inline message.
    pub async fn edit_message(
        &self,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()> {
        let target = self.message_target()?;
        self.api().edit_message_text(&target, text, keyboard).await?;
        Ok(())
    }

    fn message_target(&self) -> anyhow::Result<MessageTarget> {
        let d = &self.dispatch;
        if let (Some(chat_id), Some(message_id)) = (d.chat_id, d.message_id) {
            return Ok(MessageTarget::Chat {
                chat_id: chat_id.into(),
                message_id,
            });
        }
        let id = require(d.inline_message_id.clone(), "message_id", d.update_id)?;
        Ok(MessageTarget::Inline(id))
    }

    /// Answer the current callback query (stops the button's loading indicator).
    pub async fn answer_callback(&self, text: Option<&str>) -> anyhow::Result<()> {
        let id = require(
            self.dispatch.callback_query_id.as_deref(),
            "callback_query_id",
            self.dispatch.update_id,
        )?;
        self.api().answer_callback_query(id, text, false).await?;
        Ok(())
    }

    /// Answer the current inline query.
    pub async fn answer_inline(&self, results: &InlineQueryResults) -> anyhow::Result<()> {
        let id = require(
            self.dispatch.inline_query_id.as_deref(),
            "inline_query_id",
            self.dispatch.update_id,
        )?;
        self.api()
            .answer_inline_query(id, results, None, false, None)
            .await?;
        Ok(())
    }

    /// Status of the current chat as loaded when dispatch started.
    pub fn status(&self) -> Option<&str> {
        self.dispatch.status.as_deref()
    }

    pub async fn set_status(&self, status: &str) -> anyhow::Result<()> {
        let chat_id = self.chat_id()?;
        self.store().set_status(chat_id, status).await
    }

    pub async fn clear_status(&self) -> anyhow::Result<()> {
        let chat_id = self.chat_id()?;
        self.store().clear_status(chat_id).await
    }
}

fn require<T>(value: Option<T>, name: &str, update_id: i64) -> anyhow::Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("update {} carries no {}", update_id, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::RecordingClient;
    use crate::types::UpdateType;

    fn context(client: Arc<RecordingClient>, dispatch: DispatchContext) -> Context {
        let bot = Bot::builder(Api::new(client))
            .store(Arc::new(MemoryStore::new()))
            .build();
        Context::new(bot, dispatch)
    }

    #[tokio::test]
    async fn reply_goes_to_current_chat() {
        let client = Arc::new(RecordingClient::new());
        let mut d = DispatchContext::new(1, UpdateType::Message);
        d.chat_id = Some(42);
        let ctx = context(client.clone(), d);
        ctx.reply("hello").await.unwrap();
        let sent = client.calls_to("sendMessage");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["chat_id"], 42);
        assert_eq!(sent[0]["text"], "hello");
    }

    #[tokio::test]
    async fn missing_id_is_named_in_error() {
        let client = Arc::new(RecordingClient::new());
        let ctx = context(client.clone(), DispatchContext::new(8, UpdateType::Message));
        let err = ctx.answer_callback(None).await.unwrap_err();
        assert!(err.to_string().contains("callback_query_id"), "{}", err);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn edit_prefers_chat_message_then_inline() {
        let client = Arc::new(RecordingClient::new());
        let mut d = DispatchContext::new(2, UpdateType::CallbackQuery);
        d.inline_message_id = Some("im-3".to_string());
        let ctx = context(client.clone(), d);
        ctx.edit_message("page 2", None).await.unwrap();
        let (method, params) = client.last_call().unwrap();
        assert_eq!(method, "editMessageText");
        assert_eq!(params["inline_message_id"], "im-3");
        assert!(params.get("chat_id").is_none());
    }

    #[tokio::test]
    async fn status_round_trip_through_store() {
        let client = Arc::new(RecordingClient::new());
        let mut d = DispatchContext::new(3, UpdateType::Message);
        d.chat_id = Some(5);
        let ctx = context(client, d);
        ctx.set_status("echo").await.unwrap();
        assert_eq!(ctx.store().status(5).await.unwrap().as_deref(), Some("echo"));
        ctx.clear_status().await.unwrap();
        assert_eq!(ctx.store().status(5).await.unwrap(), None);
    }
}
