//! Bot: owns the API, the session store and the router; `BotBuilder` assembles it.

use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::api::{Api, HttpApiClient};
use crate::config::{self, Config};
use crate::context::DispatchContext;
use crate::handler::{handler, Context, HandlerResult};
use crate::registry::{Command, CommandRegistry};
use crate::router::{DefaultHandlers, Router};
use crate::store::{self, MemoryStore, SessionStore};
use crate::types::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, PreCheckoutQuery, ShippingQuery,
    Update,
};

/// Cheap to clone; all clones share the same API client, store and rules.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

struct BotInner {
    api: Api,
    store: Arc<dyn SessionStore>,
    router: Router,
}

impl Bot {
    pub fn builder(api: Api) -> BotBuilder {
        BotBuilder::new(api)
    }

    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Route one update to its handler. Returns the update id, or None when the
    /// update carries no recognised payload (nothing runs in that case).
    pub async fn dispatch(&self, update: &Update) -> anyhow::Result<Option<i64>> {
        let Some(kind) = update.kind.as_ref() else {
            log::debug!("update {}: no recognised payload, skipping", update.update_id);
            return Ok(None);
        };
        let mut dispatch = DispatchContext::from_update(update.update_id, kind);
        if let Some(chat_id) = dispatch.chat_id {
            dispatch.status = self.inner.store.status(chat_id).await?;
        }
        log::debug!(
            "update {}: {} (chat {:?})",
            update.update_id,
            dispatch.update_type,
            dispatch.chat_id
        );
        let ctx = Context::new(self.clone(), dispatch);
        self.inner.router.route(ctx, kind).await?;
        Ok(Some(update.update_id))
    }

    /// Decode a webhook POST body and dispatch it. Fails only when the body is not
    /// JSON or has no `update_id`; an undecodable payload is skipped like any unknown one.
    pub async fn handle_webhook_body(&self, body: &[u8]) -> anyhow::Result<Option<i64>> {
        let update = decode_webhook_body(body)?;
        self.dispatch(&update).await
    }

    /// Send `text` to every stored user. Users who blocked the bot (403) are
    /// removed from the store. Returns the number of successful deliveries.
    pub async fn broadcast(&self, text: &str) -> anyhow::Result<usize> {
        let users = self.inner.store.users().await?;
        let mut delivered = 0;
        for chat_id in users {
            match self.inner.api.send_message(chat_id, text, None).await {
                Ok(_) => delivered += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) if e.code() == Some(403) => {
                    log::info!("broadcast: user {} blocked the bot, removing", chat_id);
                    self.inner.store.remove_user(chat_id).await?;
                }
                Err(e) => log::warn!("broadcast: sending to {} failed: {}", chat_id, e),
            }
        }
        log::info!("broadcast delivered to {} user(s)", delivered);
        Ok(delivered)
    }
}

/// Decode a webhook POST body, keeping a malformed payload as [`Update::unknown`].
pub fn decode_webhook_body(body: &[u8]) -> anyhow::Result<Update> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| anyhow::anyhow!("invalid update body: {}", e))?;
    Update::from_value_lenient(value).map_err(|e| anyhow::anyhow!("invalid update body: {}", e))
}

/// Collects rules, default handlers and collaborators; `build` freezes them.
pub struct BotBuilder {
    api: Api,
    store: Option<Arc<dyn SessionStore>>,
    registry: CommandRegistry,
    defaults: DefaultHandlers,
    username: Option<String>,
}

impl BotBuilder {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            store: None,
            registry: CommandRegistry::new(),
            defaults: DefaultHandlers::default(),
            username: None,
        }
    }

    /// Builder wired from config: HTTP client (token from env or config), parse
    /// mode, username and the configured store.
    pub async fn from_config(config: &Config, config_path: &Path) -> anyhow::Result<Self> {
        let client = HttpApiClient::with_options(
            config::resolve_bot_token(config),
            config.bot.api_base_url.clone(),
            config.bot.backoff(),
            config.bot.request_timeout(),
        )?;
        if !client.has_token() {
            log::warn!("telegram bot token not configured; set bot.token or TELEGRAM_BOT_TOKEN");
        }
        let api = Api::new(Arc::new(client)).with_parse_mode(config.bot.parse_mode.clone());
        let store = store::open_store(&config.storage, config_path).await?;
        let mut builder = Self::new(api).store(store);
        if let Some(username) = config.bot.username.clone() {
            builder = builder.username(username);
        }
        Ok(builder)
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Bot username, so `/command@username` matches in group chats.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn parse_mode(mut self, parse_mode: impl Into<String>) -> Self {
        self.api = self.api.with_parse_mode(Some(parse_mode.into()));
        self
    }

    /// Append a prebuilt rule.
    pub fn register(mut self, command: Command) -> Self {
        self.registry.register(command);
        self
    }

    /// `/name` command (leading slash optional).
    pub fn command<F, Fut>(self, name: &str, f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Command::exact(name, handler(f)))
    }

    /// Command whose name (without the slash) matches `pattern`.
    pub fn regex_command<F, Fut>(self, pattern: &str, f: F) -> Result<Self, regex::Error>
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let regex = Regex::new(pattern)?;
        Ok(self.register(Command::pattern(regex, handler(f))))
    }

    /// Callback query whose data contains `data`.
    pub fn callback_command<F, Fut>(self, data: &str, f: F) -> Self
    where
        F: Fn(Context, CallbackQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Command::callback(data, handler(f)))
    }

    pub fn on_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.message = Some(handler(f));
        self
    }

    pub fn on_callback_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, CallbackQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.callback_query = Some(handler(f));
        self
    }

    pub fn on_inline_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, InlineQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.inline_query = Some(handler(f));
        self
    }

    pub fn on_channel_post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.channel_post = Some(handler(f));
        self
    }

    pub fn on_edited_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.edited_message = Some(handler(f));
        self
    }

    pub fn on_edited_channel_post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.edited_channel_post = Some(handler(f));
        self
    }

    pub fn on_chosen_inline_result<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, ChosenInlineResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.chosen_inline_result = Some(handler(f));
        self
    }

    pub fn on_pre_checkout_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, PreCheckoutQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.pre_checkout_query = Some(handler(f));
        self
    }

    pub fn on_shipping_query<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, ShippingQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.defaults.shipping_query = Some(handler(f));
        self
    }

    /// Freeze the rules. Without an explicit store an in-memory one is used.
    pub fn build(self) -> Bot {
        let mut registry = self.registry;
        registry.set_username(self.username);
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>);
        Bot {
            inner: Arc::new(BotInner {
                api: self.api,
                store,
                router: Router::new(registry, self.defaults),
            }),
        }
    }
}
