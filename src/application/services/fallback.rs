//! Catch-all handlers for unknown commands and plain text

use async_trait::async_trait;

use crate::application::messaging::{CommandText, Handler, HandlerResult, ReplyChannel};
use crate::domain::entities::{BotCommand, Message, COMMAND_MARKER};

/// Replies to marker-prefixed text that names no known command
pub struct UnknownCommandHandler;

#[async_trait]
impl Handler for UnknownCommandHandler {
    fn name(&self) -> &str {
        "unknown_command"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        let identifier = CommandText::parse(&message.text)
            .map(|cmd| cmd.identifier)
            .unwrap_or_default();
        tracing::debug!(chat_id = message.chat_id, "Unknown command {:?}", identifier);

        reply
            .send(&format!(
                "I don't know the command {}{}. Send {} to see what I can do.",
                COMMAND_MARKER,
                identifier,
                BotCommand::Help
            ))
            .await?;
        Ok(())
    }
}

/// Handles free-form text. Without a configured reply it stays silent.
pub struct PlainTextHandler {
    reply: Option<String>,
}

impl PlainTextHandler {
    pub fn new(reply: Option<String>) -> Self {
        Self { reply }
    }
}

#[async_trait]
impl Handler for PlainTextHandler {
    fn name(&self) -> &str {
        "plain_text"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        match &self.reply {
            Some(text) => {
                reply.send(text).await?;
            }
            None => tracing::trace!(chat_id = message.chat_id, "Ignoring plain text"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::handler::test_support::RecordingBot;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_command_reply() {
        let bot = Arc::new(RecordingBot::default());
        let reply = ReplyChannel::new(bot.clone(), 1);

        UnknownCommandHandler
            .handle(&Message::new(1, "/tracker xyz"), &reply)
            .await
            .unwrap();
        assert_eq!(
            bot.last_text().unwrap(),
            "I don't know the command /tracker. Send /help to see what I can do."
        );
    }

    #[tokio::test]
    async fn test_plain_text_reply_is_optional() {
        let bot = Arc::new(RecordingBot::default());
        let reply = ReplyChannel::new(bot.clone(), 1);

        PlainTextHandler::new(None)
            .handle(&Message::new(1, "hello"), &reply)
            .await
            .unwrap();
        assert!(bot.sent().is_empty());

        PlainTextHandler::new(Some("Send /help".to_string()))
            .handle(&Message::new(1, ""), &reply)
            .await
            .unwrap();
        assert_eq!(bot.sent(), vec![(1, "Send /help".to_string())]);
    }
}
