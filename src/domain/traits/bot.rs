use async_trait::async_trait;
use crate::application::errors::BotError;

/// Bot trait - outbound side of a messaging platform adapter
#[async_trait]
pub trait Bot: Send + Sync {
    /// Prepare the adapter before events are pumped
    async fn start(&self) -> Result<(), BotError>;

    /// Send a message to a chat, returning the platform message id
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
