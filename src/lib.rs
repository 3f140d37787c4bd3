//! Link-tracking chat bot built around a rule-based message dispatcher.
//!
//! Incoming messages are routed to exactly one handler: a known command
//! (`/start`, `/help`, `/track`, `/untrack`, `/list`, `/chat_id`), the
//! unknown-command fallback, or the plain-text fallback.

pub mod application;
pub mod domain;
pub mod infrastructure;
