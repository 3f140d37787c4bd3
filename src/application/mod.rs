//! Application layer - Routing and business handlers
//! 
//! This layer contains:
//! - Errors: Error types per concern
//! - Messaging: Command parsing, rule compilation, dispatching
//! - Services: The handlers bound to each rule

pub mod errors;
pub mod services;
pub mod messaging;
