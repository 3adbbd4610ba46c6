use reqwest::StatusCode;

/// Failure of a Bot API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("telegram bot token not configured")]
    MissingToken,
    #[error("telegram rejected the bot token: {0}")]
    Unauthorized(String),
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram server error {status}: {description}")]
    Server {
        status: StatusCode,
        description: String,
    },
    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("unexpected telegram response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// No further call can succeed; the bot must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::MissingToken | ApiError::Unauthorized(_))
    }

    /// Network failure or 5xx; the client already paused before returning it.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    /// Error code reported by Telegram, when the call reached the API.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Server { status, .. } => Some(i64::from(status.as_u16())),
            ApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
