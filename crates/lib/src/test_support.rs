//! In-process ApiClient that records calls and replays canned responses.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::api::{ApiClient, ApiError};
use crate::types::{Message, Update};

#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<(String, Value)>>,
    fixed: Mutex<HashMap<String, Value>>,
    queued: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) {
        self.fixed.lock().unwrap().insert(method.to_string(), result);
    }

    /// Answer the next call of `method` with `outcome`, ahead of any fixed response.
    pub fn enqueue(&self, method: &str, outcome: Result<Value, ApiError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p)
            .collect()
    }

    pub fn last_call(&self) -> Option<(String, Value)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ApiClient for RecordingClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = queued {
            return outcome;
        }
        if let Some(result) = self.fixed.lock().unwrap().get(method) {
            return Ok(result.clone());
        }
        if method.starts_with("send") || method.starts_with("forward") {
            return Ok(json!({
                "message_id": 1,
                "chat": { "id": params["chat_id"].as_i64().unwrap_or(0), "type": "private" },
                "date": 0,
                "text": params.get("text").cloned().unwrap_or(Value::Null),
            }));
        }
        if method == "getUpdates" {
            return Ok(json!([]));
        }
        Ok(Value::Bool(true))
    }
}

pub fn user_json(id: i64) -> Value {
    json!({ "id": id, "is_bot": false, "first_name": "Test" })
}

/// A private-chat text message; a leading `/word` gets a bot_command entity.
pub fn text_message(chat_id: i64, text: &str) -> Message {
    let mut msg = json!({
        "message_id": 100,
        "from": user_json(chat_id),
        "chat": { "id": chat_id, "type": "private" },
        "date": 0,
        "text": text,
    });
    if text.starts_with('/') {
        let len = text
            .split_whitespace()
            .next()
            .map(|w| w.encode_utf16().count())
            .unwrap_or(0);
        msg["entities"] = json!([{ "type": "bot_command", "offset": 0, "length": len }]);
    }
    serde_json::from_value(msg).unwrap()
}

pub fn message_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    Update::new(
        update_id,
        crate::types::UpdateKind::Message(text_message(chat_id, text)),
    )
}

pub fn callback_update(update_id: i64, chat_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{}", update_id),
            "from": user_json(chat_id),
            "message": {
                "message_id": 55,
                "chat": { "id": chat_id, "type": "private" },
                "date": 0,
                "text": "menu",
            },
            "chat_instance": "ci",
            "data": data,
        }
    }))
    .unwrap()
}
