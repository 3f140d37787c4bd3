//! Handlers for the informational commands

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::messaging::{Handler, HandlerResult, ReplyChannel};
use crate::domain::entities::{BotCommand, Message};
use crate::domain::traits::LinkStore;

/// `/start` - registers the chat and greets the sender
pub struct StartHandler {
    store: Arc<dyn LinkStore>,
    bot_name: String,
}

impl StartHandler {
    pub fn new(store: Arc<dyn LinkStore>, bot_name: impl Into<String>) -> Self {
        Self {
            store,
            bot_name: bot_name.into(),
        }
    }
}

#[async_trait]
impl Handler for StartHandler {
    fn name(&self) -> &str {
        "start"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        let is_new = self.store.register_chat(message.chat_id).await?;
        let who = message
            .sender
            .as_ref()
            .map(|u| u.display_name())
            .unwrap_or_else(|| "there".to_string());

        let text = if is_new {
            format!(
                "Hi, {}! I'm {}. Send me {} to start tracking a link, \
                 or {} to see everything I can do.",
                who,
                self.bot_name,
                BotCommand::Track.usage(),
                BotCommand::Help
            )
        } else {
            format!("Welcome back, {}! Send {} to see your links.", who, BotCommand::List)
        };
        reply.send(&text).await?;
        Ok(())
    }
}

/// `/help` - lists every command with its usage
pub struct HelpHandler;

impl HelpHandler {
    pub fn help_text() -> String {
        let mut help = "Available commands:\n".to_string();
        for command in BotCommand::ALL {
            help.push_str(&format!("{} - {}\n", command.usage(), command.description()));
        }
        help
    }
}

#[async_trait]
impl Handler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }

    async fn handle(&self, _message: &Message, reply: &ReplyChannel) -> HandlerResult {
        reply.send(&Self::help_text()).await?;
        Ok(())
    }
}

/// `/chat_id` - reports the id of the current chat
pub struct ChatIdHandler;

#[async_trait]
impl Handler for ChatIdHandler {
    fn name(&self) -> &str {
        "chat_id"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        reply.send(&format!("Chat ID: {}", message.chat_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::handler::test_support::RecordingBot;
    use crate::domain::entities::User;
    use crate::infrastructure::storage::MemoryLinkStore;

    #[tokio::test]
    async fn test_start_greets_then_welcomes_back() {
        let bot = Arc::new(RecordingBot::default());
        let reply = ReplyChannel::new(bot.clone(), 5);
        let handler = StartHandler::new(Arc::new(MemoryLinkStore::new(None)), "link-tracker-bot");
        let message = Message::new(5, "/start").with_sender(User::new(9).with_first_name("Ada"));

        handler.handle(&message, &reply).await.unwrap();
        assert!(bot.last_text().unwrap().starts_with("Hi, Ada! I'm link-tracker-bot."));

        handler.handle(&message, &reply).await.unwrap();
        assert!(bot.last_text().unwrap().starts_with("Welcome back, Ada!"));
    }

    #[test]
    fn test_help_lists_all_commands() {
        let help = HelpHandler::help_text();
        for command in BotCommand::ALL {
            assert!(help.contains(&command.usage()), "missing {}", command);
        }
        assert!(help.contains("/track <url> - Start tracking a link"));
    }

    #[tokio::test]
    async fn test_chat_id_reply() {
        let bot = Arc::new(RecordingBot::default());
        let reply = ReplyChannel::new(bot.clone(), -100123);
        ChatIdHandler
            .handle(&Message::new(-100123, "/chat_id"), &reply)
            .await
            .unwrap();
        assert_eq!(bot.sent(), vec![(-100123, "Chat ID: -100123".to_string())]);
    }
}
