//! Telegram adapter

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::errors::BotError;
use crate::domain::entities::{self, BotCommand};
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::TelegramConfig;

/// Delay before polling again after a failed getUpdates
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Longest text a single sendMessage accepts
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix time the message was sent
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, BotError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Api(format!(
                "{} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

impl Update {
    /// Convert a text update into a domain message. Non-text updates yield `None`.
    pub fn into_message(self) -> Option<entities::Message> {
        let msg = self.message?;
        let text = msg.text?;
        let sender = msg.from.map(|u| {
            let mut user = entities::User::new(u.id);
            user.is_bot = u.is_bot;
            user.username = u.username;
            user.first_name = u.first_name;
            user
        });

        let mut message = entities::Message::new(msg.chat.id, text)
            .with_sender_opt(sender)
            .with_platform("telegram");
        if msg.date > 0 {
            if let Some(sent_at) = DateTime::from_timestamp(msg.date, 0) {
                message = message.with_timestamp(sent_at);
            }
        }
        Some(message)
    }
}

/// Telegram bot adapter using the Bot API long-poll
pub struct TelegramAdapter {
    token: String,
    api_base: String,
    poll_timeout: i64,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>, config: &TelegramConfig) -> Self {
        Self {
            token: token.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_timeout: config.poll_timeout_seconds as i64,
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "link-tracker-bot".to_string(),
                username: "link_tracker_bot".to_string(),
            },
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<Req: Serialize + ?Sized, Res: DeserializeOwned>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Res, BotError> {
        let response = self.client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let status = response.status();
        let data: ApiResponse<Res> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(format!("{} ({}): {}", method, status, e)))?;

        data.into_result(method)
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: Option<String>,
        }

        let data: BotInfoResponse = self.call("getMe", &serde_json::json!({})).await?;
        self.info = BotInfo {
            id: data.id.to_string(),
            username: data.username.unwrap_or_else(|| data.first_name.clone()),
            name: data.first_name,
        };
        Ok(())
    }

    /// Publish the command list so clients can offer completion
    pub async fn register_commands(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command {
            command: &'static str,
            description: &'static str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<Command>,
        }

        let request = SetMyCommandsRequest {
            commands: BotCommand::ALL
                .iter()
                .map(|c| Command {
                    command: c.identifier(),
                    description: c.description(),
                })
                .collect(),
        };

        let _: bool = self.call("setMyCommands", &request).await?;
        tracing::info!("Registered {} bot commands with Telegram", request.commands.len());
        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<&'static str>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update], current: i64) -> i64 {
        updates.iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(current)
            .max(current)
    }

    /// Long-poll until `shutdown` is cancelled or the receiver is dropped,
    /// forwarding every text message into `events`.
    pub async fn pump(&self, events: mpsc::Sender<entities::Message>, shutdown: CancellationToken) {
        let mut offset: i64 = 0;
        tracing::info!("Starting Telegram long poll");

        loop {
            let updates = tokio::select! {
                _ = shutdown.cancelled() => break,
                updates = self.get_updates(offset) => updates,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("Failed to get updates: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_BACKOFF) => continue,
                    }
                }
            };

            if !updates.is_empty() {
                tracing::debug!("Received {} updates", updates.len());
            }
            offset = Self::get_next_offset(&updates, offset);

            for update in updates {
                let Some(message) = update.into_message() else {
                    continue;
                };
                if events.send(message).await.is_err() {
                    tracing::info!("Dispatcher gone, stopping Telegram long poll");
                    return;
                }
            }
        }

        tracing::info!("Telegram long poll stopped");
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<(), BotError> {
        let prefix: String = self.token.chars().take(8).collect();
        tracing::info!("Starting Telegram bot (token: {}...)", prefix);
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        tracing::debug!("Sending to {}: {}", chat_id, text);
        let chunks = split_text(text, MAX_MESSAGE_CHARS);
        if chunks.len() > 1 {
            tracing::debug!(chat_id, "Splitting reply into {} messages", chunks.len());
        }

        let mut message_id = String::new();
        for chunk in &chunks {
            let result: MessageResult = self
                .call("sendMessage", &SendMessageRequest { chat_id, text: chunk })
                .await
                .map_err(|e| {
                    tracing::error!(chat_id, "Failed to send message: {}", e);
                    e
                })?;
            message_id = result.message_id.to_string();
        }

        Ok(message_id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

/// Split `text` into chunks of at most `max_chars` characters. Chunks end
/// after a newline unless a single line is longer than `max_chars`.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_chars = 0;

    for line in text.split_inclusive('\n') {
        let line_chars = line.chars().count();
        if cur_chars + line_chars > max_chars && !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
            cur_chars = 0;
        }

        for ch in line.chars() {
            if cur_chars >= max_chars {
                out.push(std::mem::take(&mut cur));
                cur_chars = 0;
            }
            cur.push(ch);
            cur_chars += 1;
        }
    }

    if !cur.is_empty() || out.is_empty() {
        out.push(cur);
    }
    out
}
