//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.botframework/config.json`) and environment.
//! Every section is optional; a missing file means defaults throughout.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bot token, identity, and API transport settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// getUpdates long-poll settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Webhook mode settings. Webhook mode is used when `webhook.url` is set.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Where the resume cursor, statuses and users are kept.
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub token: Option<String>,
    /// Bot username without '@'; lets `/command@username` match registered commands.
    pub username: Option<String>,
    /// Default parse mode for outgoing text ("HTML", "MarkdownV2", ...). None sends plain text.
    pub parse_mode: Option<String>,
    /// API base URL (default https://api.telegram.org). Point at a local Bot API server if needed.
    pub api_base_url: Option<String>,
    /// Pause after a 5xx or network failure before the error is returned (default 10).
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Per-request HTTP timeout; must exceed `polling.timeout` (default 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backoff_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            username: None,
            parse_mode: None,
            api_base_url: None,
            backoff_secs: default_backoff_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BotConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    /// Long-poll timeout in seconds passed to getUpdates (default 30).
    #[serde(default = "default_poll_timeout")]
    pub timeout: u64,
    /// Maximum updates per getUpdates call, 1-100 (default 100).
    #[serde(default = "default_poll_limit")]
    pub limit: u32,
    /// Pause before polling again after a non-transient getUpdates failure (default 2).
    #[serde(default = "default_error_delay_secs")]
    pub error_delay_secs: u64,
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_poll_limit() -> u32 {
    100
}

fn default_error_delay_secs() -> u64 {
    2
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout: default_poll_timeout(),
            limit: default_poll_limit(),
            error_delay_secs: default_error_delay_secs(),
        }
    }
}

impl PollingConfig {
    pub fn error_delay(&self) -> Duration {
        Duration::from_secs(self.error_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Public HTTPS URL Telegram POSTs updates to. If unset, long-poll getUpdates is used.
    pub url: Option<String>,
    /// Optional secret for webhook verification (X-Telegram-Bot-Api-Secret-Token).
    pub secret: Option<String>,
    /// Bind address of the local server (default "127.0.0.1"); put a TLS proxy in front.
    #[serde(default = "default_webhook_bind")]
    pub bind: String,
    /// Port of the local server (default 8443).
    #[serde(default = "default_webhook_port")]
    pub port: u16,
    /// Route that receives updates (default "/webhook").
    #[serde(default = "default_webhook_path")]
    pub path: String,
    /// Remove the webhook on SIGINT/SIGTERM (default true).
    #[serde(default = "default_true")]
    pub delete_on_shutdown: bool,
}

fn default_webhook_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    8443
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            bind: default_webhook_bind(),
            port: default_webhook_port(),
            path: default_webhook_path(),
            delete_on_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost on exit; the cursor restarts from Telegram's unconfirmed updates.
    #[default]
    Memory,
    /// JSON file at `storage.path`.
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// File for the "file" backend. Relative paths are resolved against the config file's parent.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("state.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// How updates are acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Polling,
    Webhook { url: String },
}

/// Webhook when a non-empty `webhook.url` is configured, polling otherwise.
pub fn run_mode(config: &Config) -> RunMode {
    match non_empty(config.webhook.url.as_deref()) {
        Some(url) => RunMode::Webhook { url },
        None => RunMode::Polling,
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolve the bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_bot_token(config: &Config) -> Option<String> {
    non_empty(std::env::var("TELEGRAM_BOT_TOKEN").ok().as_deref())
        .or_else(|| non_empty(config.bot.token.as_deref()))
}

/// Resolve the webhook secret: env TELEGRAM_WEBHOOK_SECRET overrides config.
pub fn resolve_webhook_secret(config: &Config) -> Option<String> {
    non_empty(std::env::var("TELEGRAM_WEBHOOK_SECRET").ok().as_deref())
        .or_else(|| non_empty(config.webhook.secret.as_deref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("BOTFRAMEWORK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".botframework").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or BOTFRAMEWORK_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the session store file: absolute paths as-is, relative ones against the config file's parent.
pub fn resolve_storage_path(storage: &StorageConfig, config_path: &Path) -> PathBuf {
    if storage.path.is_absolute() {
        return storage.path.clone();
    }
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(&storage.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.polling.timeout, 30);
        assert_eq!(c.polling.limit, 100);
        assert_eq!(c.bot.backoff(), Duration::from_secs(10));
        assert_eq!(c.webhook.path, "/webhook");
        assert_eq!(c.storage.backend, StorageBackend::Memory);
        assert_eq!(run_mode(&c), RunMode::Polling);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: Config = serde_json::from_str(
            r#"{"bot": {"username": "demo_bot", "backoffSecs": 3},
                "webhook": {"url": " https://example.org/hook ", "deleteOnShutdown": false},
                "storage": {"backend": "file"}}"#,
        )
        .expect("parse");
        assert_eq!(c.bot.username.as_deref(), Some("demo_bot"));
        assert_eq!(c.bot.backoff_secs, 3);
        assert_eq!(c.bot.request_timeout_secs, 60);
        assert!(!c.webhook.delete_on_shutdown);
        assert_eq!(c.webhook.port, 8443);
        assert_eq!(c.storage.backend, StorageBackend::File);
        assert_eq!(
            run_mode(&c),
            RunMode::Webhook {
                url: "https://example.org/hook".to_string()
            }
        );
    }

    #[test]
    fn blank_webhook_url_means_polling() {
        let mut c = Config::default();
        c.webhook.url = Some("   ".to_string());
        assert_eq!(run_mode(&c), RunMode::Polling);
    }

    #[test]
    fn storage_path_relative_to_config_dir() {
        let storage = StorageConfig::default();
        assert_eq!(
            resolve_storage_path(&storage, Path::new("/home/user/.botframework/config.json")),
            PathBuf::from("/home/user/.botframework/state.json")
        );
        let storage = StorageConfig {
            backend: StorageBackend::File,
            path: PathBuf::from("/var/lib/bot/state.json"),
        };
        assert_eq!(
            resolve_storage_path(&storage, Path::new("config.json")),
            PathBuf::from("/var/lib/bot/state.json")
        );
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let path = std::env::temp_dir()
            .join(format!("botframework-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).expect("load");
        assert_eq!(used, path);
        assert!(config.bot.token.is_none());
    }
}
