//! Domain layer - Core business objects and the abstractions around them
//! 
//! This layer contains:
//! - Entities: Commands, messages, users
//! - Traits: Abstractions for infrastructure (Bot, LinkStore)

pub mod entities;
pub mod traits;
