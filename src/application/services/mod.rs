//! Application services - The handlers bound to each routing rule

pub mod commands;
pub mod fallback;
pub mod links;

use std::sync::Arc;

use crate::application::errors::ConfigError;
use crate::application::messaging::RuleSet;
use crate::domain::entities::{BotCommand, CommandRegistry};
use crate::domain::traits::LinkStore;

pub use commands::{ChatIdHandler, HelpHandler, StartHandler};
pub use fallback::{PlainTextHandler, UnknownCommandHandler};
pub use links::{ListHandler, TrackHandler, UntrackHandler};

/// Collaborators the standard handlers need
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<dyn LinkStore>,
    pub bot_name: String,
    pub plain_text_reply: Option<String>,
}

/// Bind every command to its business handler
pub fn standard_registry(deps: &HandlerDeps) -> Result<CommandRegistry, ConfigError> {
    let store = &deps.store;
    let start = StartHandler::new(Arc::clone(store), deps.bot_name.clone());

    CommandRegistry::builder()
        .bind(BotCommand::Start, Arc::new(start))
        .bind(BotCommand::Help, Arc::new(HelpHandler))
        .bind(BotCommand::Track, Arc::new(TrackHandler::new(Arc::clone(store))))
        .bind(BotCommand::Untrack, Arc::new(UntrackHandler::new(Arc::clone(store))))
        .bind(BotCommand::List, Arc::new(ListHandler::new(Arc::clone(store))))
        .bind(BotCommand::ChatId, Arc::new(ChatIdHandler))
        .build()
}

/// Registry plus fallbacks, compiled into the rule set the dispatcher uses
pub fn standard_rules(deps: &HandlerDeps) -> Result<RuleSet, ConfigError> {
    let registry = standard_registry(deps)?;
    Ok(RuleSet::compile(
        &registry,
        Arc::new(UnknownCommandHandler),
        Arc::new(PlainTextHandler::new(deps.plain_text_reply.clone())),
    ))
}
