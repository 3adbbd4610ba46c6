//! Results for answerInlineQuery.

use serde::Serialize;

use crate::keyboard::InlineKeyboard;

#[derive(Debug, Clone, Serialize)]
struct InputTextMessageContent {
    message_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<String>,
}

/// An `article` inline result.
#[derive(Debug, Clone, Serialize)]
pub struct InlineQueryResultArticle {
    #[serde(rename = "type")]
    typ: &'static str,
    pub id: String,
    pub title: String,
    input_message_content: InputTextMessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboard>,
}

/// Accumulates results; ids are assigned sequentially starting at "0".
#[derive(Debug, Clone, Default)]
pub struct InlineQueryResults {
    articles: Vec<InlineQueryResultArticle>,
}

impl InlineQueryResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_article(
        &mut self,
        title: impl Into<String>,
        message_text: impl Into<String>,
        description: Option<String>,
        reply_markup: Option<InlineKeyboard>,
    ) -> &mut Self {
        let id = self.articles.len().to_string();
        self.articles.push(InlineQueryResultArticle {
            typ: "article",
            id,
            title: title.into(),
            input_message_content: InputTextMessageContent {
                message_text: message_text.into(),
                parse_mode: None,
            },
            description,
            reply_markup: reply_markup.filter(|kb| !kb.is_empty()),
        });
        self
    }

    /// Set the parse mode of the most recently added article's message text.
    pub fn with_parse_mode(&mut self, parse_mode: impl Into<String>) -> &mut Self {
        if let Some(last) = self.articles.last_mut() {
            last.input_message_content.parse_mode = Some(parse_mode.into());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// JSON array ready for the `results` parameter.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.articles).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn articles_get_sequential_ids() {
        let mut results = InlineQueryResults::new();
        results
            .add_article("One", "first", Some("the first".into()), None)
            .add_article("Two", "*second*", None, Some(InlineKeyboard::new()))
            .with_parse_mode("Markdown");
        let json = results.to_json();
        assert_eq!(results.len(), 2);
        assert_eq!(json[0]["type"], "article");
        assert_eq!(json[0]["id"], "0");
        assert_eq!(json[0]["description"], "the first");
        assert_eq!(json[1]["id"], "1");
        assert_eq!(json[1]["input_message_content"]["parse_mode"], "Markdown");
        // Empty keyboards are dropped rather than sent as empty markup.
        assert!(json[1].get("reply_markup").is_none());
    }
}
