//! botframework: Telegram bot framework. Typed Bot API client, command registry and
//! update router, session store, inline keyboards, and polling/webhook runners.

pub mod api;
pub mod bot;
pub mod config;
pub mod context;
pub mod handler;
pub mod init;
pub mod inline;
pub mod keyboard;
pub mod polling;
pub mod registry;
pub mod router;
pub mod store;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use bot::{Bot, BotBuilder};
pub use context::DispatchContext;
pub use handler::{Context, HandlerResult};
