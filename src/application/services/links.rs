//! Handlers for `/track`, `/untrack` and `/list`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::application::errors::{HandlerError, StorageError};
use crate::application::messaging::{CommandText, Handler, HandlerResult, ReplyChannel};
use crate::domain::entities::{BotCommand, Message};
use crate::domain::traits::LinkStore;

/// Parse an absolute http(s) link, returning its normalized form
pub fn normalize_link(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("{} is not a valid link ({})", raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{} must start with http:// or https://", raw));
    }
    if url.host_str().is_none() {
        return Err(format!("{} has no host", raw));
    }
    Ok(url.to_string())
}

/// Extract and validate the link argument, replying with a hint on bad input
async fn link_argument(
    message: &Message,
    reply: &ReplyChannel,
    command: BotCommand,
) -> Result<String, HandlerError> {
    let raw = CommandText::parse(&message.text).and_then(|cmd| cmd.first_arg());

    let Some(raw) = raw else {
        reply
            .send(&format!("Please add a link: {}", command.usage()))
            .await?;
        return Err(HandlerError::MissingArgument(format!("{} needs a link", command)));
    };

    match normalize_link(raw) {
        Ok(link) => Ok(link),
        Err(reason) => {
            reply.send(&format!("{}. Usage: {}", reason, command.usage())).await?;
            Err(HandlerError::InvalidArgument(reason))
        }
    }
}

pub struct TrackHandler {
    store: Arc<dyn LinkStore>,
}

impl TrackHandler {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for TrackHandler {
    fn name(&self) -> &str {
        "track"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        let link = link_argument(message, reply, BotCommand::Track).await?;

        match self.store.track(message.chat_id, &link).await {
            Ok(true) => {
                tracing::info!(chat_id = message.chat_id, "Tracking {}", link);
                reply.send(&format!("Now tracking {}", link)).await?;
            }
            Ok(false) => {
                reply.send(&format!("{} is already tracked", link)).await?;
            }
            Err(e @ StorageError::LimitReached { limit, .. }) => {
                let text = format!(
                    "You can track at most {} links. Remove one with {} first.",
                    limit,
                    BotCommand::Untrack.usage()
                );
                reply.send(&text).await?;
                return Err(e.into());
            }
        }
        Ok(())
    }
}

pub struct UntrackHandler {
    store: Arc<dyn LinkStore>,
}

impl UntrackHandler {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for UntrackHandler {
    fn name(&self) -> &str {
        "untrack"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        let link = link_argument(message, reply, BotCommand::Untrack).await?;

        if self.store.untrack(message.chat_id, &link).await? {
            tracing::info!(chat_id = message.chat_id, "Stopped tracking {}", link);
            reply.send(&format!("Stopped tracking {}", link)).await?;
        } else {
            reply.send(&format!("{} was not tracked", link)).await?;
        }
        Ok(())
    }
}

pub struct ListHandler {
    store: Arc<dyn LinkStore>,
}

impl ListHandler {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ListHandler {
    fn name(&self) -> &str {
        "list"
    }

    async fn handle(&self, message: &Message, reply: &ReplyChannel) -> HandlerResult {
        let links = self.store.list(message.chat_id).await?;
        tracing::debug!(chat_id = message.chat_id, "Listing {} links", links.len());

        let text = if links.is_empty() {
            format!("No tracked links yet. Add one with {}", BotCommand::Track.usage())
        } else {
            let mut text = format!("Tracked links ({}):\n", links.len());
            for (i, link) in links.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, link));
            }
            text
        };
        reply.send(&text).await?;
        Ok(())
    }
}
