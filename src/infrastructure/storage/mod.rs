//! In-memory link storage

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::LinkStore;

/// Tracked links per chat, kept for the lifetime of the process
pub struct MemoryLinkStore {
    links: RwLock<HashMap<i64, Vec<String>>>,
    max_links_per_chat: Option<usize>,
}

impl MemoryLinkStore {
    pub fn new(max_links_per_chat: Option<usize>) -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            max_links_per_chat,
        }
    }

    pub async fn chat_count(&self) -> usize {
        self.links.read().await.len()
    }
}

impl Default for MemoryLinkStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn register_chat(&self, chat_id: i64) -> Result<bool, StorageError> {
        let mut links = self.links.write().await;
        if links.contains_key(&chat_id) {
            return Ok(false);
        }
        links.insert(chat_id, Vec::new());
        Ok(true)
    }

    async fn track(&self, chat_id: i64, url: &str) -> Result<bool, StorageError> {
        let mut links = self.links.write().await;
        let chat_links = links.entry(chat_id).or_default();

        if chat_links.iter().any(|l| l == url) {
            return Ok(false);
        }
        if let Some(limit) = self.max_links_per_chat {
            if chat_links.len() >= limit {
                return Err(StorageError::LimitReached { chat_id, limit });
            }
        }
        chat_links.push(url.to_string());
        Ok(true)
    }

    async fn untrack(&self, chat_id: i64, url: &str) -> Result<bool, StorageError> {
        let mut links = self.links.write().await;
        let Some(chat_links) = links.get_mut(&chat_id) else {
            return Ok(false);
        };

        let before = chat_links.len();
        chat_links.retain(|l| l != url);
        Ok(chat_links.len() != before)
    }

    async fn list(&self, chat_id: i64) -> Result<Vec<String>, StorageError> {
        let links = self.links.read().await;
        Ok(links.get(&chat_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_chat_once() {
        let store = MemoryLinkStore::default();
        assert!(store.register_chat(1).await.unwrap());
        assert!(!store.register_chat(1).await.unwrap());
        assert_eq!(store.chat_count().await, 1);
    }

    #[tokio::test]
    async fn test_links_are_per_chat_and_ordered() {
        let store = MemoryLinkStore::default();
        assert!(store.track(1, "https://b.example/").await.unwrap());
        assert!(store.track(1, "https://a.example/").await.unwrap());
        assert!(!store.track(1, "https://b.example/").await.unwrap());
        assert!(store.track(2, "https://c.example/").await.unwrap());

        assert_eq!(store.list(1).await.unwrap(), vec!["https://b.example/", "https://a.example/"]);
        assert_eq!(store.list(2).await.unwrap(), vec!["https://c.example/"]);
        assert!(store.list(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untrack() {
        let store = MemoryLinkStore::default();
        assert!(!store.untrack(1, "https://a.example/").await.unwrap());
        store.track(1, "https://a.example/").await.unwrap();
        assert!(store.untrack(1, "https://a.example/").await.unwrap());
        assert!(!store.untrack(1, "https://a.example/").await.unwrap());
    }

    #[tokio::test]
    async fn test_limit_per_chat() {
        let store = MemoryLinkStore::new(Some(1));
        store.track(1, "https://a.example/").await.unwrap();
        // re-adding an existing link is not a limit violation
        assert!(!store.track(1, "https://a.example/").await.unwrap());
        let err = store.track(1, "https://b.example/").await.unwrap_err();
        assert!(matches!(err, StorageError::LimitReached { chat_id: 1, limit: 1 }));
        assert!(store.track(2, "https://b.example/").await.unwrap());
    }
}
