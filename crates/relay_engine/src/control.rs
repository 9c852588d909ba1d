use std::time::Duration;

use relay_core::StatusView;
use relay_logging::{relay_debug, relay_info, relay_warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::NotifyError;

const STARTED_REPLY: &str = "Bot started! Monitoring SMS statistics.";

#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub api_base: String,
    pub token: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
    pub retry_delay: Duration,
}

impl ControlSettings {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            poll_timeout: Duration::from_secs(25),
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<IncomingMessage>,
}

#[derive(Deserialize)]
struct IncomingMessage {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Serialize)]
struct Reply<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Answers bot commands while the reconciliation loop runs.
///
/// `/start` acknowledges that the relay is running; `/status` reports the
/// loop's latest [`StatusView`].
pub struct ControlChannel {
    client: reqwest::Client,
    settings: ControlSettings,
    status: watch::Receiver<StatusView>,
    offset: i64,
}

impl ControlChannel {
    pub fn new(
        settings: ControlSettings,
        status: watch::Receiver<StatusView>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(settings.poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            status,
            offset: 0,
        })
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        relay_info!("Control channel started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.poll_once() => {
                    if let Err(err) = result {
                        relay_warn!("Control channel poll failed: {}", err);
                        tokio::select! {
                            _ = tokio::time::sleep(self.settings.retry_delay) => {}
                            _ = shutdown.cancelled() => break,
                        }
                    }
                }
            }
        }
        relay_info!("Control channel stopped");
    }

    /// Fetches pending updates once and answers any commands. Returns the
    /// number of commands answered.
    pub async fn poll_once(&mut self) -> Result<usize, NotifyError> {
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&GetUpdates {
                offset: self.offset,
                timeout: self.settings.poll_timeout.as_secs(),
                allowed_updates: ["message"],
            })
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?
            .json::<UpdatesResponse>()
            .await
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;
        if !response.ok {
            return Err(NotifyError::Rejected(
                response.description.unwrap_or_default(),
            ));
        }

        let mut answered = 0;
        for update in response.result {
            self.offset = self.offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let text = message.text.unwrap_or_default();
            let status = self.status.borrow().clone();
            let Some(reply) = command_reply(&text, &status) else {
                relay_debug!("Ignoring non-command update {}", update.update_id);
                continue;
            };
            self.reply(message.chat.id, &reply).await?;
            relay_info!("Processed {} command", text.split_whitespace().next().unwrap_or(""));
            answered += 1;
        }
        Ok(answered)
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&Reply { chat_id, text })
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().to_string()));
        }
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.settings.api_base, self.settings.token, method)
    }
}

/// Reply text for a bot command, or `None` when `text` is not one we answer.
pub fn command_reply(text: &str, status: &StatusView) -> Option<String> {
    let command = text.split_whitespace().next()?;
    let command = command.split('@').next().unwrap_or(command);
    match command {
        "/start" => Some(STARTED_REPLY.to_string()),
        "/status" => Some(status.to_string()),
        _ => None,
    }
}
