//! Long-poll loop: getUpdates, dispatch in order, persist the cursor after each update.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::api::ApiError;
use crate::bot::Bot;
use crate::config::PollingConfig;
use crate::types::Update;

/// Whether `err` (possibly a handler error wrapping an API error) means no further call can succeed.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<ApiError>().is_some_and(ApiError::is_fatal))
}

/// Drives a [`Bot`] from getUpdates. Only one poller per bot token may run at a time.
pub struct Poller {
    bot: Bot,
    config: PollingConfig,
    running: AtomicBool,
    stop_signal: Notify,
}

impl Poller {
    pub fn new(bot: Bot, config: PollingConfig) -> Self {
        Self {
            bot,
            config,
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the loop to exit. A pending getUpdates call is abandoned; a batch being
    /// dispatched is finished first.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_waiters();
    }

    /// Poll until stopped or a fatal API error. A registered webhook is removed first,
    /// since Telegram refuses getUpdates while one is set.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("polling: removing webhook before getUpdates");
        if let Err(e) = self.bot.api().delete_webhook(false).await {
            if e.is_fatal() {
                self.stop();
                return Err(e.into());
            }
            log::warn!("polling: deleteWebhook failed: {}", e);
        }

        let mut offset = self.bot.store().offset().await?;
        log::info!("polling: starting getUpdates loop (offset {:?})", offset);
        let result = self.poll_loop(&mut offset).await;
        self.stop();
        log::info!("polling: getUpdates loop stopped");
        result
    }

    /// [`run`](Self::run) until `shutdown` completes, then stop and wait for the
    /// loop to wind down, so no handler is cut off before its offset is stored.
    pub async fn run_until<F>(self: Arc<Self>, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let run = self.clone().run();
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = shutdown => {
                log::info!("polling: stopping after the current batch");
                self.stop();
                run.await
            }
        }
    }

    async fn poll_loop(&self, offset: &mut Option<i64>) -> anyhow::Result<()> {
        loop {
            let stopped = self.stop_signal.notified();
            if !self.is_running() {
                break;
            }
            let polled = tokio::select! {
                polled = self
                    .bot
                    .api()
                    .get_updates(*offset, self.config.limit, self.config.timeout) => polled,
                _ = stopped => break,
            };
            let updates = match polled {
                Ok(updates) => updates,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) if e.is_transient() => {
                    // The client already paused for its back-off.
                    log::warn!("polling: getUpdates failed: {}", e);
                    continue;
                }
                Err(e) => {
                    log::warn!("polling: getUpdates failed: {}", e);
                    tokio::time::sleep(self.config.error_delay()).await;
                    continue;
                }
            };
            if let Some(next) = self.process_batch(&updates).await? {
                *offset = Some(next);
            }
        }
        Ok(())
    }

    /// Dispatch `updates` in order, persisting `update_id + 1` after each one.
    /// Handler errors are logged and skipped; a fatal error stops the batch.
    /// Returns the offset for the next getUpdates call, if any update was seen.
    pub async fn process_batch(&self, updates: &[Update]) -> anyhow::Result<Option<i64>> {
        let mut next = None;
        for update in updates {
            match self.bot.dispatch(update).await {
                Ok(_) => {}
                Err(e) if is_fatal(&e) => {
                    log::error!("polling: update {}: {:#}", update.update_id, e);
                    return Err(e);
                }
                Err(e) => log::error!("polling: update {} handler failed: {:#}", update.update_id, e),
            }
            let offset = update.update_id + 1;
            self.bot.store().set_offset(offset).await?;
            next = Some(offset);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Api;
    use crate::store::{MemoryStore, SessionStore};
    use crate::test_support::{message_update, RecordingClient};
    use serde_json::json;
    use std::sync::Mutex;

    fn poller(client: Arc<RecordingClient>, bot_builder: impl FnOnce(Api) -> Bot) -> Arc<Poller> {
        let bot = bot_builder(Api::new(client));
        Arc::new(Poller::new(
            bot,
            PollingConfig {
                timeout: 0,
                limit: 100,
                error_delay_secs: 0,
            },
        ))
    }

    #[test]
    fn fatal_detection_looks_through_context() {
        let err = anyhow::Error::new(ApiError::Unauthorized("Unauthorized".into()))
            .context("handler for /start");
        assert!(is_fatal(&err));
        assert!(!is_fatal(&anyhow::anyhow!("other")));
        let api = anyhow::Error::new(ApiError::Api {
            code: 400,
            description: "Bad Request".into(),
        });
        assert!(!is_fatal(&api));
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_batch() {
        let client = Arc::new(RecordingClient::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let store_for_bot = store.clone();
        let poller = poller(client, move |api| {
            Bot::builder(api)
                .store(store_for_bot)
                .command("fail", |_ctx, _msg| async {
                    Err::<(), _>(anyhow::anyhow!("handler exploded"))
                })
                .on_message(move |_ctx, msg| {
                    let s = s.clone();
                    async move {
                        s.lock().unwrap().push(msg.text.unwrap_or_default());
                        anyhow::Ok(())
                    }
                })
                .build()
        });

        let batch = [
            message_update(1, 1, "/fail"),
            message_update(2, 1, "second"),
            Update::unknown(3),
            message_update(4, 1, "fourth"),
        ];
        let next = poller.process_batch(&batch).await.unwrap();
        assert_eq!(next, Some(5));
        assert_eq!(*seen.lock().unwrap(), vec!["second", "fourth"]);
        assert_eq!(store.offset().await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn unauthorized_stops_the_loop() {
        let client = Arc::new(RecordingClient::new());
        client.enqueue(
            "getUpdates",
            Ok(json!([{
                "update_id": 40,
                "message": {
                    "message_id": 1, "chat": { "id": 2, "type": "private" },
                    "date": 0, "text": "hi"
                }
            }])),
        );
        client.enqueue("getUpdates", Err(ApiError::Unauthorized("Unauthorized".into())));
        let poller = poller(client.clone(), |api| Bot::builder(api).build());

        let err = poller.clone().run().await.unwrap_err();
        assert!(is_fatal(&err));
        assert!(!poller.is_running());
        assert_eq!(client.calls_to("deleteWebhook").len(), 1);
        let polls = client.calls_to("getUpdates");
        assert_eq!(polls.len(), 2);
        assert!(polls[0].get("offset").is_none());
        assert_eq!(polls[1]["offset"], 41);
    }

    #[tokio::test]
    async fn resumes_from_stored_offset_and_stops_on_request() {
        let client = Arc::new(RecordingClient::new());
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        store.set_offset(900).await.unwrap();
        client.enqueue("getUpdates", Err(ApiError::Unauthorized("stop".into())));
        let s = store.clone();
        let poller = poller(client.clone(), move |api| Bot::builder(api).store(s).build());
        assert!(poller.clone().run().await.is_err());
        assert_eq!(client.calls_to("getUpdates")[0]["offset"], 900);

        poller.stop();
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn fatal_handler_error_stops_batch() {
        let client = Arc::new(RecordingClient::new());
        client.enqueue("sendMessage", Err(ApiError::Unauthorized("Unauthorized".into())));
        let poller = poller(client, |api| {
            Bot::builder(api)
                .on_message(|ctx, _msg| async move {
                    ctx.reply("pong").await?;
                    anyhow::Ok(())
                })
                .build()
        });
        let batch = [message_update(1, 1, "ping"), message_update(2, 1, "ping")];
        let err = poller.process_batch(&batch).await.unwrap_err();
        assert!(is_fatal(&err));
    }

    #[tokio::test]
    async fn shutdown_lets_the_running_handler_finish() {
        let client = Arc::new(RecordingClient::new());
        client.enqueue(
            "getUpdates",
            Ok(json!([{
                "update_id": 70,
                "message": {
                    "message_id": 1, "chat": { "id": 2, "type": "private" },
                    "date": 0, "text": "slow"
                }
            }])),
        );
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let finished = Arc::new(Mutex::new(false));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let started_tx = Arc::new(Mutex::new(Some(started_tx)));
        let (s, f) = (store.clone(), finished.clone());
        let poller = poller(client.clone(), move |api| {
            Bot::builder(api)
                .store(s)
                .on_message(move |_ctx, _msg| {
                    let finished = f.clone();
                    let started = started_tx.lock().unwrap().take();
                    async move {
                        if let Some(tx) = started {
                            let _ = tx.send(());
                        }
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        *finished.lock().unwrap() = true;
                        anyhow::Ok(())
                    }
                })
                .build()
        });

        let shutdown = async {
            let _ = started_rx.await;
        };
        poller.clone().run_until(shutdown).await.unwrap();
        assert!(*finished.lock().unwrap());
        assert_eq!(store.offset().await.unwrap(), Some(71));
        assert!(!poller.is_running());
        assert_eq!(client.calls_to("getUpdates").len(), 1);
    }

    struct StalledPoll;

    #[async_trait::async_trait]
    impl crate::api::ApiClient for StalledPoll {
        async fn call(
            &self,
            method: &str,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, ApiError> {
            if method == "getUpdates" {
                std::future::pending::<()>().await;
            }
            Ok(json!(true))
        }
    }

    #[tokio::test]
    async fn stop_abandons_a_pending_long_poll() {
        let bot = Bot::builder(Api::new(Arc::new(StalledPoll))).build();
        let poller = Arc::new(Poller::new(bot, PollingConfig::default()));
        let shutdown = tokio::time::sleep(std::time::Duration::from_millis(50));
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            poller.clone().run_until(shutdown),
        )
        .await
        .expect("loop exits without waiting for getUpdates");
        assert!(result.is_ok());
        assert!(!poller.is_running());
    }
}
