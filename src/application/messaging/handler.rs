//! Handler contract shared by command, unknown-command and plain-text handlers

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::{BotError, HandlerError};
use crate::domain::entities::Message;
use crate::domain::traits::Bot;

/// Handler result
pub type HandlerResult = Result<(), HandlerError>;

/// Outbound side handed to a handler: sends go to the originating chat
#[derive(Clone)]
pub struct ReplyChannel {
    bot: Arc<dyn Bot>,
    chat_id: i64,
}

impl ReplyChannel {
    pub fn new(bot: Arc<dyn Bot>, chat_id: i64) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, text: &str) -> Result<String, BotError> {
        self.bot.send_message(self.chat_id, text).await
    }
}

/// A unit of business behavior invoked with exactly one matched message.
///
/// Implementations reply through the [`ReplyChannel`] and report failures
/// as [`HandlerError`]. For user-input problems a handler sends a
/// friendly reply first and then returns the error so the dispatcher can
/// log it.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult;
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::domain::traits::BotInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Handler that counts invocations and optionally fails
    pub struct NamedHandler {
        name: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl NamedHandler {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing(name: impl Into<String>) -> Self {
            Self {
                fail: true,
                ..Self::new(name)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Handler for NamedHandler {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle(&self, _message: &Message, reply: &ReplyChannel) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HandlerError::MissingArgument("url".to_string()));
            }
            reply.send(&self.name).await?;
            Ok(())
        }
    }

    /// Bot that records every outgoing message
    #[derive(Default)]
    pub struct RecordingBot {
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingBot {
        pub fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn last_text(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
        }
    }

    #[async_trait]
    impl Bot for RecordingBot {
        async fn start(&self) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, BotError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id, text.to_string()));
            Ok(sent.len().to_string())
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo {
                id: "test".to_string(),
                name: "test-bot".to_string(),
                username: "test_bot".to_string(),
            }
        }
    }
}
