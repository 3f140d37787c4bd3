//! Application layer errors

use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error: {0}")]
    Api(String),
}

/// Errors a handler reports back to the dispatcher
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Reply failed: {0}")]
    Reply(#[from] BotError),
}

impl HandlerError {
    /// True when the failure was caused by what the user typed
    pub fn is_user_error(&self) -> bool {
        matches!(self, HandlerError::MissingArgument(_) | HandlerError::InvalidArgument(_))
    }
}

/// Routing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No rule matched message text {0:?}")]
    NoRuleMatched(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Link limit of {limit} reached for chat {chat_id}")]
    LimitReached { chat_id: i64, limit: usize },
}

/// Configuration errors, fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate command token: {0}")]
    DuplicateToken(String),

    #[error("Invalid command token: {0}")]
    InvalidToken(String),

    #[error("Command token {0} is a prefix of {1}")]
    PrefixCollision(String, String),

    #[error("Command {0} is bound to more than one handler")]
    DuplicateBinding(String),

    #[error("No handler bound for command {0}")]
    MissingHandler(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
