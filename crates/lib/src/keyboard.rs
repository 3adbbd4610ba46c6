//! Inline keyboards: a row-by-row builder and the pagination row layout.
//!
//! Pagination buttons carry `prefix/page` as callback data. The button for the
//! page being shown carries [`INERT_CALLBACK_DATA`], which the callback matcher
//! treats as "already handled, do nothing".

use serde::{Deserialize, Serialize};

/// Callback data of buttons that must not trigger anything.
pub const INERT_CALLBACK_DATA: &str = "null";

/// Pages shown one button each; above this the five-button window is used.
const MAX_FLAT_PAGES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_inline_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_inline_query_current_chat: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
            switch_inline_query: None,
            switch_inline_query_current_chat: None,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
            switch_inline_query: None,
            switch_inline_query_current_chat: None,
        }
    }

    /// Opens inline mode with `query`; in the current chat when `current_chat` is true.
    pub fn switch_inline(text: impl Into<String>, query: impl Into<String>, current_chat: bool) -> Self {
        let query = Some(query.into());
        let (switch_inline_query, switch_inline_query_current_chat) = if current_chat {
            (None, query)
        } else {
            (query, None)
        };
        Self {
            text: text.into(),
            callback_data: None,
            url: None,
            switch_inline_query,
            switch_inline_query_current_chat,
        }
    }

    /// A button that does nothing when pressed.
    pub fn inert(text: impl Into<String>) -> Self {
        Self::callback(text, INERT_CALLBACK_DATA)
    }

    pub fn is_inert(&self) -> bool {
        self.callback_data.as_deref() == Some(INERT_CALLBACK_DATA)
    }
}

/// Builder for `reply_markup` inline keyboards. Buttons accumulate in a pending row
/// until [`InlineKeyboard::add_row`] commits it; serialization commits it implicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineKeyboard {
    rows: Vec<Vec<InlineKeyboardButton>>,
    pending: Vec<InlineKeyboardButton>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(mut self, button: InlineKeyboardButton) -> Self {
        self.pending.push(button);
        self
    }

    pub fn add_button(&mut self, text: impl Into<String>, callback_data: impl Into<String>) -> &mut Self {
        self.pending.push(InlineKeyboardButton::callback(text, callback_data));
        self
    }

    pub fn add_url_button(&mut self, text: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.pending.push(InlineKeyboardButton::url(text, url));
        self
    }

    pub fn add_switch_inline_button(
        &mut self,
        text: impl Into<String>,
        query: impl Into<String>,
        current_chat: bool,
    ) -> &mut Self {
        self.pending
            .push(InlineKeyboardButton::switch_inline(text, query, current_chat));
        self
    }

    /// Commit the pending buttons as one row. No-op when nothing is pending.
    pub fn add_row(&mut self) -> &mut Self {
        if !self.pending.is_empty() {
            let row = std::mem::take(&mut self.pending);
            self.rows.push(row);
        }
        self
    }

    /// Commit pending buttons, then append a pagination row (see [`layout`]).
    pub fn add_pagination_row(&mut self, current_page: i64, total_pages: i64, prefix: &str) -> &mut Self {
        self.add_row();
        let row = layout(current_page, total_pages, prefix);
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.pending.is_empty()
    }

    /// Committed rows plus the pending one.
    pub fn rows(&self) -> Vec<Vec<InlineKeyboardButton>> {
        let mut rows = self.rows.clone();
        if !self.pending.is_empty() {
            rows.push(self.pending.clone());
        }
        rows
    }

    /// `{"inline_keyboard": [[...], ...]}` as expected in `reply_markup`.
    pub fn to_reply_markup(&self) -> serde_json::Value {
        serde_json::json!({ "inline_keyboard": self.rows() })
    }
}

impl Serialize for InlineKeyboard {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_reply_markup().serialize(serializer)
    }
}

/// Pagination row for `current_page` of `total_pages` (1-based).
///
/// Up to five pages get one button each. Past that the row is a five-button window:
/// pages 1-4 and the last page near the start, the first page and the last four
/// near the end, and `«1 ‹prev •current• next› last»` in between. The current page
/// is always shown as `•N•` and is inert, except that a lone page is a plain inert
/// `1`. Out-of-range pages are clamped; a non-positive total yields no buttons.
pub fn layout(current_page: i64, total_pages: i64, prefix: &str) -> Vec<InlineKeyboardButton> {
    if total_pages <= 0 {
        return Vec::new();
    }
    if total_pages == 1 {
        return vec![InlineKeyboardButton::inert("1")];
    }
    let current = current_page.clamp(1, total_pages);
    let page = |n: i64, label: String| -> InlineKeyboardButton {
        if n == current {
            InlineKeyboardButton::inert(format!("•{}•", n))
        } else {
            InlineKeyboardButton::callback(label, page_data(prefix, n))
        }
    };

    if total_pages <= MAX_FLAT_PAGES {
        return (1..=total_pages).map(|n| page(n, n.to_string())).collect();
    }

    if current <= 3 {
        [1, 2, 3, 4, total_pages]
            .into_iter()
            .map(|n| page(n, n.to_string()))
            .collect()
    } else if current >= total_pages - 2 {
        [1, total_pages - 3, total_pages - 2, total_pages - 1, total_pages]
            .into_iter()
            .map(|n| page(n, n.to_string()))
            .collect()
    } else {
        vec![
            page(1, "«1".to_string()),
            page(current - 1, format!("‹{}", current - 1)),
            page(current, String::new()),
            page(current + 1, format!("{}›", current + 1)),
            page(total_pages, format!("{}»", total_pages)),
        ]
    }
}

/// Callback data for `page` under `prefix`.
pub fn page_data(prefix: &str, page: i64) -> String {
    format!("{}/{}", prefix, page)
}

/// Page number encoded in pagination callback data, if `data` belongs to `prefix`.
pub fn parse_page(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?
        .strip_prefix('/')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(row: &[InlineKeyboardButton]) -> Vec<&str> {
        row.iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn layout_near_start() {
        let row = layout(3, 10, "list");
        assert_eq!(labels(&row), vec!["1", "2", "•3•", "4", "10"]);
        assert!(row[2].is_inert());
        for (button, page) in [(0, 1), (1, 2), (3, 4), (4, 10)] {
            assert_eq!(
                row[button].callback_data.as_deref(),
                Some(format!("list/{}", page).as_str())
            );
        }
    }

    #[test]
    fn layout_single_page_is_one_inert_button() {
        let row = layout(1, 1, "list");
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].text, "1");
        assert!(row[0].is_inert());
        assert_eq!(labels(&layout(7, 1, "list")), vec!["1"]);
    }

    #[test]
    fn layout_few_pages_are_all_numbered() {
        let row = layout(2, 4, "p");
        assert_eq!(labels(&row), vec!["1", "•2•", "3", "4"]);
        assert_eq!(row[3].callback_data.as_deref(), Some("p/4"));
    }

    #[test]
    fn layout_middle_window() {
        let row = layout(6, 12, "list");
        assert_eq!(labels(&row), vec!["«1", "‹5", "•6•", "7›", "12»"]);
        assert_eq!(row[1].callback_data.as_deref(), Some("list/5"));
        assert_eq!(row[4].callback_data.as_deref(), Some("list/12"));
    }

    #[test]
    fn layout_near_end() {
        let row = layout(9, 10, "list");
        assert_eq!(labels(&row), vec!["1", "7", "8", "•9•", "10"]);
    }

    #[test]
    fn layout_clamps_and_rejects_empty() {
        assert!(layout(1, 0, "list").is_empty());
        assert!(layout(1, -3, "list").is_empty());
        assert_eq!(labels(&layout(0, 3, "l")), vec!["•1•", "2", "3"]);
        assert_eq!(labels(&layout(99, 7, "l")), vec!["1", "4", "5", "6", "•7•"]);
    }

    #[test]
    fn parse_page_inverts_page_data() {
        for button in layout(5, 20, "items") {
            if let Some(data) = button.callback_data.as_deref().filter(|d| *d != INERT_CALLBACK_DATA) {
                let page = parse_page(data, "items").expect("page");
                assert_eq!(page_data("items", page), data);
            }
        }
        assert_eq!(parse_page("other/3", "items"), None);
        assert_eq!(parse_page("items/x", "items"), None);
    }

    #[test]
    fn keyboard_rows_and_markup() {
        let mut kb = InlineKeyboard::new();
        kb.add_button("Yes", "vote/yes").add_button("No", "vote/no").add_row();
        kb.add_url_button("Docs", "https://core.telegram.org/bots/api");
        kb.add_pagination_row(1, 2, "page");
        let markup = kb.to_reply_markup();
        let rows = markup["inline_keyboard"].as_array().expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][1]["callback_data"], "vote/no");
        assert_eq!(rows[1][0]["url"], "https://core.telegram.org/bots/api");
        assert!(rows[1][0].get("callback_data").is_none());
        assert_eq!(rows[2][0]["text"], "•1•");
        assert_eq!(serde_json::to_value(&kb).expect("serialize"), markup);
    }
}
