//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::errors::BotError;
use crate::domain::entities::{Message, User};
use crate::domain::traits::{Bot, BotInfo};

/// Chat id used for every console message
pub const CONSOLE_CHAT_ID: i64 = 0;

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "link-tracker-bot".to_string(),
                username: "console".to_string(),
            },
        }
    }

    /// Read stdin until EOF or shutdown, one event per line
    pub async fn pump(&self, events: mpsc::Sender<Message>, shutdown: CancellationToken) {
        let stdin = BufReader::new(tokio::io::stdin());
        pump_lines(stdin, events, shutdown).await;
    }
}

/// Forward each line of `reader` as a console message. Dropping `events`
/// on EOF ends the dispatcher's stream.
pub async fn pump_lines<R>(reader: R, events: mpsc::Sender<Message>, shutdown: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let sender = User::new(CONSOLE_CHAT_ID).with_username("console");

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let message = Message::new(CONSOLE_CHAT_ID, line.trim_end())
                    .with_sender(sender.clone())
                    .with_platform("console");
                if events.send(message).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::info!("Console input closed");
                break;
            }
            Err(e) => {
                tracing::error!("Failed to read console input: {}", e);
                break;
            }
        }
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn send_message(&self, _chat_id: i64, text: &str) -> Result<String, BotError> {
        println!("[BOT] {}", text);
        Ok("console_msg".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
