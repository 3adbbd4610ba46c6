//! Transport to the Bot API: `POST {base}/bot{token}/{method}` with a JSON body.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::error::ApiError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes one Bot API method and returns the decoded `result` field.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError>;
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// reqwest-backed client. 5xx and network failures pause for `backoff` before the
/// error is returned; nothing is retried here.
#[derive(Clone)]
pub struct HttpApiClient {
    base_url: String,
    token: Option<String>,
    backoff: Duration,
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(token: Option<String>) -> Result<Self, ApiError> {
        Self::with_options(token, None, DEFAULT_BACKOFF, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `request_timeout` must exceed the long-poll timeout used with getUpdates.
    pub fn with_options(
        token: Option<String>,
        base_url: Option<String>,
        backoff: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url,
            token,
            backoff,
            client,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn method_url(&self, method: &str) -> Result<String, ApiError> {
        let token = self.token.as_ref().ok_or(ApiError::MissingToken)?;
        Ok(format!("{}/bot{}/{}", self.base_url, token, method))
    }

    async fn pause(&self) {
        if !self.backoff.is_zero() {
            tokio::time::sleep(self.backoff).await;
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.method_url(method)?;
        let res = match self.client.post(&url).json(&params).send().await {
            Ok(res) => res,
            Err(e) => {
                // The URL carries the token; keep it out of logs and errors.
                let e = e.without_url();
                log::warn!(
                    "telegram {} transport error, backing off {:?}: {}",
                    method,
                    self.backoff,
                    e
                );
                self.pause().await;
                return Err(ApiError::Transport(e));
            }
        };
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if status.is_success() {
            let data: ApiResponse = serde_json::from_str(&body)?;
            if data.ok {
                return Ok(data.result.unwrap_or(serde_json::Value::Null));
            }
            return Err(ApiError::Api {
                code: data.error_code.unwrap_or(i64::from(status.as_u16())),
                description: data.description.unwrap_or_default(),
            });
        }

        let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();
        let description = parsed
            .as_ref()
            .and_then(|d| d.description.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());

        if status == reqwest::StatusCode::UNAUTHORIZED {
            log::error!("telegram {} rejected the bot token: {}", method, description);
            return Err(ApiError::Unauthorized(description));
        }
        if status.is_server_error() {
            log::warn!(
                "telegram {} failed with {}, backing off {:?}",
                method,
                status,
                self.backoff
            );
            self.pause().await;
            return Err(ApiError::Server {
                status,
                description,
            });
        }
        let code = parsed
            .and_then(|d| d.error_code)
            .unwrap_or(i64::from(status.as_u16()));
        log::debug!("telegram {} failed: {} {}", method, code, description);
        Err(ApiError::Api { code, description })
    }
}
