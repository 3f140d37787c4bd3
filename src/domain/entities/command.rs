use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::ConfigError;
use crate::application::messaging::handler::Handler;

/// Leading character of every command
pub const COMMAND_MARKER: char = '/';

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("identifier pattern is valid"));

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BotCommand {
    Start,
    Help,
    Track,
    Untrack,
    List,
    ChatId,
}

impl BotCommand {
    pub const ALL: [BotCommand; 6] = [
        BotCommand::Start,
        BotCommand::Help,
        BotCommand::Track,
        BotCommand::Untrack,
        BotCommand::List,
        BotCommand::ChatId,
    ];

    /// Identifier without the marker, e.g. `chat_id`
    pub fn identifier(&self) -> &'static str {
        match self {
            BotCommand::Start => "start",
            BotCommand::Help => "help",
            BotCommand::Track => "track",
            BotCommand::Untrack => "untrack",
            BotCommand::List => "list",
            BotCommand::ChatId => "chat_id",
        }
    }

    /// Full token including the marker, e.g. `/chat_id`
    pub fn token(&self) -> String {
        format!("{}{}", COMMAND_MARKER, self.identifier())
    }

    pub fn description(&self) -> &'static str {
        match self {
            BotCommand::Start => "Register this chat",
            BotCommand::Help => "Show available commands",
            BotCommand::Track => "Start tracking a link",
            BotCommand::Untrack => "Stop tracking a link",
            BotCommand::List => "Show tracked links",
            BotCommand::ChatId => "Show the id of this chat",
        }
    }

    pub fn usage(&self) -> String {
        match self {
            BotCommand::Track | BotCommand::Untrack => format!("{} <url>", self.token()),
            _ => self.token(),
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.identifier() == identifier)
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", COMMAND_MARKER, self.identifier())
    }
}

/// Checks that identifiers are well-formed, pairwise distinct and prefix-free.
pub fn validate_identifiers<'a, I>(identifiers: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = &'a str>,
{
    let identifiers: Vec<&str> = identifiers.into_iter().collect();
    let mut seen = HashSet::new();

    for ident in &identifiers {
        if !IDENTIFIER_PATTERN.is_match(ident) {
            return Err(ConfigError::InvalidToken(format!("{}{}", COMMAND_MARKER, ident)));
        }
        if !seen.insert(*ident) {
            return Err(ConfigError::DuplicateToken(format!("{}{}", COMMAND_MARKER, ident)));
        }
    }

    for a in &identifiers {
        for b in &identifiers {
            if a != b && b.starts_with(a) {
                return Err(ConfigError::PrefixCollision(
                    format!("{}{}", COMMAND_MARKER, a),
                    format!("{}{}", COMMAND_MARKER, b),
                ));
            }
        }
    }

    Ok(())
}

/// Immutable binding of every command to its handler
#[derive(Clone)]
pub struct CommandRegistry {
    bindings: Vec<(BotCommand, Arc<dyn Handler>)>,
}

impl CommandRegistry {
    pub fn builder() -> CommandRegistryBuilder {
        CommandRegistryBuilder::default()
    }

    pub fn get(&self, command: BotCommand) -> Option<&Arc<dyn Handler>> {
        self.bindings
            .iter()
            .find(|(c, _)| *c == command)
            .map(|(_, h)| h)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BotCommand, &Arc<dyn Handler>)> {
        self.bindings.iter().map(|(c, h)| (*c, h))
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(c, _)| c.identifier())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Collects bindings and checks them once in [`CommandRegistryBuilder::build`]
#[derive(Default)]
pub struct CommandRegistryBuilder {
    bindings: Vec<(BotCommand, Arc<dyn Handler>)>,
}

impl CommandRegistryBuilder {
    pub fn bind(mut self, command: BotCommand, handler: Arc<dyn Handler>) -> Self {
        self.bindings.push((command, handler));
        self
    }

    pub fn build(self) -> Result<CommandRegistry, ConfigError> {
        validate_identifiers(BotCommand::ALL.iter().map(|c| c.identifier()))?;

        let mut bound = HashSet::new();
        for (command, _) in &self.bindings {
            if !bound.insert(*command) {
                return Err(ConfigError::DuplicateBinding(command.token()));
            }
        }

        if let Some(missing) = BotCommand::ALL.iter().find(|c| !bound.contains(*c)) {
            return Err(ConfigError::MissingHandler(missing.token()));
        }

        // Keep registry order stable regardless of bind order
        let mut bindings = self.bindings;
        bindings.sort_by_key(|(c, _)| *c);

        tracing::debug!("Command registry built with {} commands", bindings.len());
        Ok(CommandRegistry { bindings })
    }
}
