//! Demo bot wired by `botframework run`: one handler per extension point.

use botframework::inline::InlineQueryResults;
use botframework::keyboard::{parse_page, InlineKeyboard};
use botframework::{Bot, BotBuilder};
use rand::Rng;

const LIST_PREFIX: &str = "list";
const ITEM_COUNT: usize = 47;
const PAGE_SIZE: usize = 4;
const ECHO_STATUS: &str = "echo";

const HELP: &str = "/start - register for broadcasts\n\
/help - this text\n\
/list - browse a paginated list\n\
/roll, /roll20 - roll a die (d6 or dN)\n\
/echo - repeat your next message\n\
Inline: @bot <text> in any chat";

fn total_pages() -> i64 {
    ITEM_COUNT.div_ceil(PAGE_SIZE) as i64
}

fn page_text(page: i64) -> String {
    let page = page.clamp(1, total_pages());
    let start = (page as usize - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(ITEM_COUNT);
    let mut text = format!("Page {} of {}\n", page, total_pages());
    for n in start + 1..=end {
        text.push_str(&format!("\n• Item {}", n));
    }
    text
}

fn page_keyboard(page: i64) -> InlineKeyboard {
    let mut keyboard = InlineKeyboard::new();
    keyboard.add_pagination_row(page, total_pages(), LIST_PREFIX);
    keyboard
}

/// Sides of the die named by a roll command: "roll" is a d6, "roll20" a d20.
fn die_sides(command: &str) -> u64 {
    command
        .trim_start_matches('/')
        .split('@')
        .next()
        .and_then(|c| c.strip_prefix("roll"))
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(6)
}

fn roll(sides: u64) -> u64 {
    rand::thread_rng().gen_range(1..=sides.max(1))
}

pub fn build(builder: BotBuilder) -> anyhow::Result<Bot> {
    let bot = builder
        .command("start", |ctx, msg| async move {
            let chat_id = ctx.chat_id()?;
            let name = msg.from.as_ref().map(|u| u.full_name()).unwrap_or_default();
            let text = if ctx.store().add_user(chat_id).await? {
                format!("Welcome, {}! You will receive broadcasts. Try /help.", name)
            } else {
                format!("Welcome back, {}! Try /help.", name)
            };
            ctx.reply(&text).await?;
            anyhow::Ok(())
        })
        .command("help", |ctx, _msg| async move {
            ctx.reply(HELP).await?;
            anyhow::Ok(())
        })
        .command("list", |ctx, _msg| async move {
            ctx.reply_with_keyboard(&page_text(1), &page_keyboard(1)).await?;
            anyhow::Ok(())
        })
        .command("echo", |ctx, _msg| async move {
            ctx.set_status(ECHO_STATUS).await?;
            ctx.reply("Send me something and I will repeat it.").await?;
            anyhow::Ok(())
        })
        .regex_command(r"^roll\d*$", |ctx, msg| async move {
            let command = msg
                .command_entity()
                .and_then(|e| msg.entity_text(e))
                .unwrap_or_default();
            let sides = die_sides(&command);
            ctx.reply(&format!("🎲 d{}: {}", sides, roll(sides))).await?;
            anyhow::Ok(())
        })?
        .callback_command("list/", |ctx, query| async move {
            let page = query
                .data
                .as_deref()
                .and_then(|d| parse_page(d, LIST_PREFIX))
                .unwrap_or(1);
            ctx.edit_message(&page_text(page), Some(&page_keyboard(page)))
                .await?;
            ctx.answer_callback(None).await?;
            anyhow::Ok(())
        })
        .on_message(|ctx, msg| async move {
            let Some(text) = msg.text() else {
                return anyhow::Ok(());
            };
            if ctx.status() == Some(ECHO_STATUS) {
                ctx.clear_status().await?;
                ctx.reply(text).await?;
            } else if msg.chat.is_private() {
                ctx.reply("I did not understand that. Try /help.").await?;
            }
            anyhow::Ok(())
        })
        .on_callback_query(|ctx, _query| async move {
            ctx.answer_callback(Some("Nothing to do here")).await?;
            anyhow::Ok(())
        })
        .on_inline_query(|ctx, query| async move {
            let text = query.query.trim();
            if text.is_empty() {
                return anyhow::Ok(());
            }
            let mut results = InlineQueryResults::new();
            results
                .add_article("Upper case", text.to_uppercase(), None, None)
                .add_article("Lower case", text.to_lowercase(), None, None)
                .add_article(
                    "Reversed",
                    text.chars().rev().collect::<String>(),
                    Some(format!("{} characters", text.chars().count())),
                    None,
                );
            ctx.answer_inline(&results).await?;
            anyhow::Ok(())
        })
        .build();
    Ok(bot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_all_items() {
        assert_eq!(total_pages(), 12);
        assert!(page_text(1).starts_with("Page 1 of 12"));
        assert!(page_text(1).ends_with("• Item 4"));
        assert!(page_text(12).ends_with("Item 47"));
        assert_eq!(page_text(99), page_text(12));
    }

    #[test]
    fn die_sides_from_command() {
        assert_eq!(die_sides("/roll"), 6);
        assert_eq!(die_sides("/roll20"), 20);
        assert_eq!(die_sides("/roll20@demo_bot"), 20);
        assert_eq!(die_sides("/roll0"), 6);
    }

    #[test]
    fn roll_stays_within_die() {
        for _ in 0..200 {
            assert!((1..=6).contains(&roll(6)));
        }
        assert_eq!(roll(1), 1);
    }
}
