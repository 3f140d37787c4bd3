use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Per-chat set of tracked links
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Remember a chat; returns true when it was not known before
    async fn register_chat(&self, chat_id: i64) -> Result<bool, StorageError>;

    /// Returns true when the link was newly added
    async fn track(&self, chat_id: i64, url: &str) -> Result<bool, StorageError>;

    /// Returns true when the link was present
    async fn untrack(&self, chat_id: i64, url: &str) -> Result<bool, StorageError>;

    /// Tracked links in insertion order
    async fn list(&self, chat_id: i64) -> Result<Vec<String>, StorageError>;
}
