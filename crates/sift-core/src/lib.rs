//! # sift-core
//!
//! Foundation crate for the sift retrieval engine.
//! Defines the data model, external service traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod similarity;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::SiftConfig;
pub use errors::{SiftError, SiftResult};
pub use models::{Clue, ClueNode, Entity, Event, Key, SearchRequest, SearchScope, Section};
