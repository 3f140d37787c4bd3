//! Message handling - Rule compilation and dispatch

pub mod dispatcher;
pub mod handler;
pub mod matcher;
pub mod parser;

pub use dispatcher::{
    DispatchMode, DispatchOutcome, DispatcherOptions, MessageDispatcher, RunOutcome, RunSummary,
};
pub use handler::{Handler, HandlerResult, ReplyChannel};
pub use matcher::{Matcher, Rule, RuleSet};
pub use parser::CommandText;
