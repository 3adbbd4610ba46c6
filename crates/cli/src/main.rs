mod demo;

use botframework::api::Api;
use botframework::config::{self, RunMode};
use botframework::polling::Poller;
use botframework::{webhook, BotBuilder};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "botframework")]
#[command(about = "Run and manage a Telegram bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the demo bot: webhook server when webhook.url is set, getUpdates long polling otherwise.
    Run {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Webhook server port (default from config or 8443)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Dispatch one update JSON read from stdin (process-per-request webhook hosting).
    Handle {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Manage the webhook registered with Telegram.
    Webhook {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: WebhookAction,
    },

    /// Send a message to every user recorded by /start.
    Broadcast {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Message text
        text: String,
    },

    /// Show the bot account (getMe).
    Me {
        /// Config file path (default: BOTFRAMEWORK_CONFIG_PATH or ~/.botframework/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Register a webhook URL.
    Set {
        url: String,
        /// Secret Telegram echoes in X-Telegram-Bot-Api-Secret-Token (default from config)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Remove the webhook so getUpdates works again.
    Delete {
        /// Also drop updates Telegram has queued.
        #[arg(long)]
        drop_pending: bool,
    },
    /// Show the current webhook registration.
    Info,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("botframework {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Run { config, port }) => run_bot(config, port).await,
        Some(Commands::Handle { config }) => run_handle(config).await,
        Some(Commands::Webhook { config, action }) => run_webhook(config, action).await,
        Some(Commands::Broadcast { config, text }) => run_broadcast(config, &text).await,
        Some(Commands::Me { config }) => run_me(config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = botframework::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Load config and build the demo bot from it. Fails early when no token is configured.
async fn load_bot(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(config::Config, botframework::Bot)> {
    let (mut config, path) = config::load_config(config_path)?;
    if config::resolve_bot_token(&config).is_none() {
        anyhow::bail!(
            "telegram bot token not configured; set bot.token in {} or TELEGRAM_BOT_TOKEN",
            path.display()
        );
    }
    config.webhook.secret = config::resolve_webhook_secret(&config);
    let builder = BotBuilder::from_config(&config, &path).await?;
    let bot = demo::build(builder)?;
    Ok((config, bot))
}

async fn run_bot(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, bot) = load_bot(config_path).await?;
    if let Some(p) = port {
        config.webhook.port = p;
    }
    match config::run_mode(&config) {
        RunMode::Webhook { url } => {
            log::info!("starting in webhook mode ({})", url);
            webhook::serve(bot, config.webhook).await
        }
        RunMode::Polling => {
            log::info!("starting in polling mode");
            let poller = Arc::new(Poller::new(bot, config.polling));
            poller.run_until(webhook::shutdown_signal()).await
        }
    }
}

async fn run_handle(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (_config, bot) = load_bot(config_path).await?;
    let mut body = Vec::new();
    tokio::io::stdin().read_to_end(&mut body).await?;
    match bot.handle_webhook_body(&body).await? {
        Some(id) => log::info!("update {} handled", id),
        None => log::info!("update carried no supported payload"),
    }
    Ok(())
}

async fn api_from_config(config_path: Option<PathBuf>) -> anyhow::Result<(config::Config, Api)> {
    let (config, path) = config::load_config(config_path)?;
    let builder = BotBuilder::from_config(&config, &path).await?;
    Ok((config, builder.build().api().clone()))
}

async fn run_webhook(config_path: Option<PathBuf>, action: WebhookAction) -> anyhow::Result<()> {
    let (config, api) = api_from_config(config_path).await?;
    match action {
        WebhookAction::Set { url, secret } => {
            let secret = secret.or_else(|| config::resolve_webhook_secret(&config));
            api.set_webhook(&url, secret.as_deref(), None, None).await?;
            println!("webhook set to {}", url);
        }
        WebhookAction::Delete { drop_pending } => {
            api.delete_webhook(drop_pending).await?;
            println!("webhook deleted");
        }
        WebhookAction::Info => {
            let info = api.get_webhook_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}

async fn run_broadcast(config_path: Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    let (_config, bot) = load_bot(config_path).await?;
    let delivered = bot.broadcast(text).await?;
    println!("delivered to {} user(s)", delivered);
    Ok(())
}

async fn run_me(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (_config, api) = api_from_config(config_path).await?;
    let me = api.get_me().await?;
    println!("{}", serde_json::to_string_pretty(&me)?);
    Ok(())
}
