//! Command registry: ordered rules matched against messages and callback data.
//!
//! Rules are appended while the bot is being built and never change afterwards.
//! Exact commands are tried before regex commands; within one kind, registration
//! order decides. The first matching rule wins.

use regex::Regex;

use crate::handler::{Context, Handler};
use crate::keyboard::INERT_CALLBACK_DATA;
use crate::types::{CallbackQuery, Message, UpdateKind, UpdateType};

/// What a rule matches on.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// `/name` as the message's first entity.
    Exact(String),
    /// Regex tested against the first command's name (without the slash).
    Pattern(Regex),
    /// Substring of callback query data.
    CallbackData(String),
}

impl Trigger {
    pub fn update_type(&self) -> UpdateType {
        match self {
            Trigger::Exact(_) | Trigger::Pattern(_) => UpdateType::Message,
            Trigger::CallbackData(_) => UpdateType::CallbackQuery,
        }
    }

    /// Lower runs first within the same update type.
    pub fn priority(&self) -> u8 {
        match self {
            Trigger::Exact(_) | Trigger::CallbackData(_) => 0,
            Trigger::Pattern(_) => 1,
        }
    }
}

#[derive(Clone)]
enum CommandHandler {
    Message(Handler<Message>),
    Callback(Handler<CallbackQuery>),
}

/// A trigger bound to its handler.
#[derive(Clone)]
pub struct Command {
    trigger: Trigger,
    handler: CommandHandler,
}

impl Command {
    /// `/name`, matched case-sensitively.
    pub fn exact(name: impl Into<String>, handler: Handler<Message>) -> Self {
        let name = name.into();
        let name = name.strip_prefix('/').map(str::to_string).unwrap_or(name);
        Self {
            trigger: Trigger::Exact(name),
            handler: CommandHandler::Message(handler),
        }
    }

    pub fn pattern(regex: Regex, handler: Handler<Message>) -> Self {
        Self {
            trigger: Trigger::Pattern(regex),
            handler: CommandHandler::Message(handler),
        }
    }

    pub fn callback(data: impl Into<String>, handler: Handler<CallbackQuery>) -> Self {
        Self {
            trigger: Trigger::CallbackData(data.into()),
            handler: CommandHandler::Callback(handler),
        }
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn update_type(&self) -> UpdateType {
        self.trigger.update_type()
    }

    pub fn priority(&self) -> u8 {
        self.trigger.priority()
    }
}

/// Outcome of looking up callback data.
pub enum CallbackMatch<'a> {
    /// The inert sentinel (e.g. the current-page button): handled, nothing to run.
    Inert,
    Handler(&'a Handler<CallbackQuery>),
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    message: Vec<Command>,
    callback: Vec<Command>,
    username: Option<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept `/name@username` for exact commands.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty());
    }

    /// Append a rule. Duplicates are kept; the earlier one shadows the later.
    pub fn register(&mut self, command: Command) {
        let rules = match command.update_type() {
            UpdateType::CallbackQuery => &mut self.callback,
            _ => &mut self.message,
        };
        // Stable: after every rule of the same or higher precedence.
        let pos = rules.partition_point(|c| c.priority() <= command.priority());
        rules.insert(pos, command);
    }

    pub fn len(&self) -> usize {
        self.message.len() + self.callback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handler of the first message rule matching `message`.
    pub fn find_message(&self, message: &Message) -> Option<&Handler<Message>> {
        let first_command = message
            .entities
            .first()
            .filter(|e| e.is_bot_command())
            .and_then(|e| message.entity_text(e));
        let any_command = message
            .command_entity()
            .and_then(|e| message.entity_text(e));

        self.message.iter().find_map(|cmd| {
            let CommandHandler::Message(handler) = &cmd.handler else {
                return None;
            };
            let matched = match &cmd.trigger {
                Trigger::Exact(name) => first_command
                    .as_deref()
                    .is_some_and(|text| self.matches_exact(text, name)),
                Trigger::Pattern(regex) => any_command
                    .as_deref()
                    .is_some_and(|text| regex.is_match(self.command_name(text))),
                Trigger::CallbackData(_) => false,
            };
            matched.then_some(handler)
        })
    }

    /// Rule for callback `data`; the inert sentinel is recognised before any rule.
    pub fn find_callback(&self, data: &str) -> Option<CallbackMatch<'_>> {
        if data == INERT_CALLBACK_DATA {
            return Some(CallbackMatch::Inert);
        }
        self.callback.iter().find_map(|cmd| match (&cmd.trigger, &cmd.handler) {
            (Trigger::CallbackData(needle), CommandHandler::Callback(handler))
                if data.contains(needle.as_str()) =>
            {
                Some(CallbackMatch::Handler(handler))
            }
            _ => None,
        })
    }

    /// Run the matching rule for a message or callback query. Returns whether the
    /// update was handled; other update types never match.
    pub async fn try_match(&self, ctx: &Context, kind: &UpdateKind) -> anyhow::Result<bool> {
        match kind {
            UpdateKind::Message(message) => match self.find_message(message) {
                Some(handler) => {
                    log::debug!("update {}: message command matched", ctx.update_id());
                    handler(ctx.clone(), message.clone()).await?;
                    Ok(true)
                }
                None => Ok(false),
            },
            UpdateKind::CallbackQuery(query) => {
                let data = query.data.as_deref().unwrap_or_default();
                match self.find_callback(data) {
                    Some(CallbackMatch::Inert) => {
                        log::debug!("update {}: inert callback", ctx.update_id());
                        Ok(true)
                    }
                    Some(CallbackMatch::Handler(handler)) => {
                        log::debug!(
                            "update {}: callback command matched {:?}",
                            ctx.update_id(),
                            data
                        );
                        handler(ctx.clone(), query.clone()).await?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// `text` is the entity text, e.g. "/start" or "/start@my_bot".
    fn matches_exact(&self, text: &str, name: &str) -> bool {
        let Some(rest) = text
            .strip_prefix('/')
            .and_then(|t| t.strip_prefix(name))
        else {
            return false;
        };
        if rest.is_empty() {
            return true;
        }
        match (&self.username, rest.strip_prefix('@')) {
            (Some(username), Some(addressed)) => addressed.eq_ignore_ascii_case(username),
            _ => false,
        }
    }

    /// Command name without the slash and without an `@username` addressed to this bot.
    fn command_name<'t>(&self, text: &'t str) -> &'t str {
        let name = text.strip_prefix('/').unwrap_or(text);
        if let (Some(username), Some((base, addressed))) = (&self.username, name.split_once('@')) {
            if addressed.eq_ignore_ascii_case(username) {
                return base;
            }
        }
        name
    }
}
