//! Update router: registry first, then the default handler of the update's variant.

use crate::handler::{Context, Handler, HandlerResult};
use crate::registry::CommandRegistry;
use crate::types::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, PreCheckoutQuery, ShippingQuery,
    UpdateKind,
};

/// Fallback handlers, one per update variant. Unset ones do nothing.
#[derive(Clone, Default)]
pub struct DefaultHandlers {
    pub message: Option<Handler<Message>>,
    pub callback_query: Option<Handler<CallbackQuery>>,
    pub inline_query: Option<Handler<InlineQuery>>,
    pub channel_post: Option<Handler<Message>>,
    pub edited_message: Option<Handler<Message>>,
    pub edited_channel_post: Option<Handler<Message>>,
    pub chosen_inline_result: Option<Handler<ChosenInlineResult>>,
    pub pre_checkout_query: Option<Handler<PreCheckoutQuery>>,
    pub shipping_query: Option<Handler<ShippingQuery>>,
}

#[derive(Clone, Default)]
pub struct Router {
    registry: CommandRegistry,
    defaults: DefaultHandlers,
}

impl Router {
    pub fn new(registry: CommandRegistry, defaults: DefaultHandlers) -> Self {
        Self { registry, defaults }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run exactly one handler for `kind`, or none when no rule matches and no
    /// default is set. Handler errors are returned unchanged.
    pub async fn route(&self, ctx: Context, kind: &UpdateKind) -> HandlerResult {
        if self.registry.try_match(&ctx, kind).await? {
            return Ok(());
        }
        let d = &self.defaults;
        match kind {
            UpdateKind::Message(m) => run(&d.message, ctx, m).await,
            UpdateKind::CallbackQuery(q) => run(&d.callback_query, ctx, q).await,
            UpdateKind::InlineQuery(q) => run(&d.inline_query, ctx, q).await,
            UpdateKind::ChannelPost(m) => run(&d.channel_post, ctx, m).await,
            UpdateKind::EditedMessage(m) => run(&d.edited_message, ctx, m).await,
            UpdateKind::EditedChannelPost(m) => run(&d.edited_channel_post, ctx, m).await,
            UpdateKind::ChosenInlineResult(r) => run(&d.chosen_inline_result, ctx, r).await,
            UpdateKind::PreCheckoutQuery(q) => run(&d.pre_checkout_query, ctx, q).await,
            UpdateKind::ShippingQuery(q) => run(&d.shipping_query, ctx, q).await,
        }
    }
}

async fn run<E: Clone>(handler: &Option<Handler<E>>, ctx: Context, entity: &E) -> HandlerResult {
    match handler {
        Some(h) => {
            log::debug!(
                "update {}: default {} handler",
                ctx.update_id(),
                ctx.dispatch().update_type
            );
            h(ctx, entity.clone()).await
        }
        None => Ok(()),
    }
}
