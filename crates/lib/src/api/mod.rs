//! Telegram Bot API: transport trait, reqwest client, and typed methods.

mod client;
mod error;
mod methods;

pub use client::{
    ApiClient, HttpApiClient, DEFAULT_BACKOFF, DEFAULT_REQUEST_TIMEOUT, TELEGRAM_API_BASE,
};
pub use error::ApiError;
pub use methods::{Api, ChatAction, ChatId, MessageTarget};
