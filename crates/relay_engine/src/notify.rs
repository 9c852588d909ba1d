use std::time::Duration;

use relay_core::Message;
use relay_logging::{relay_error, relay_info, relay_warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("sink request failed: {0}")]
    Transport(String),
    #[error("sink rejected message: {0}")]
    Rejected(String),
}

/// Downstream destination for newly discovered messages.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), NotifyError>;
}

/// Posts messages to a Telegram chat through the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let text = format_message(message);
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .client
            .post(url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: &text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            // The request URL carries the bot token; keep it out of the error.
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {detail}")));
        }
        Ok(())
    }
}

/// Telegram Markdown text for one message.
pub fn format_message(message: &Message) -> String {
    format!(
        "📨 *New SMS Received*\n\n\
         📞 *Number*: `+{}`\n\n\
         💬 *Message*: {}\n\n\
         💰 *Revenue*: {}\n\n\
         🕒 *Time*: {}\n",
        message.number,
        escape_markdown(&message.body),
        message.revenue,
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Escapes the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
}

/// Hands messages to a [`Notifier`] without ever failing the caller.
///
/// With the default single attempt this is best effort: a sink outage loses
/// the message. Retries are bounded by `attempts`.
pub struct Outbox<N> {
    notifier: N,
    attempts: u32,
    retry_delay: Duration,
    shutdown: CancellationToken,
}

impl<N: Notifier> Outbox<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            attempts: 1,
            retry_delay: Duration::ZERO,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_retries(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Abandons pending retries once `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn emit(&self, message: &Message) -> Delivery {
        for attempt in 1..=self.attempts {
            match self.notifier.send(message).await {
                Ok(()) => {
                    relay_info!("Sent SMS to sink: {}...", preview(&message.body));
                    return Delivery::Delivered;
                }
                Err(err) if attempt < self.attempts => {
                    relay_warn!("Delivery attempt {} failed: {}", attempt, err);
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = self.shutdown.cancelled() => {
                            relay_warn!(
                                "Shutdown during delivery retries; dropping SMS from +{}",
                                message.number
                            );
                            break;
                        }
                    }
                }
                Err(err) => {
                    relay_error!(
                        "Failed to deliver SMS from +{} after {} attempt(s): {}",
                        message.number,
                        self.attempts,
                        err
                    );
                }
            }
        }
        Delivery::Dropped
    }
}

fn preview(body: &str) -> String {
    body.chars().take(50).collect()
}
