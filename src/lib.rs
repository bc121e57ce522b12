//! A technical support assistant that answers from a local knowledge base.
//!
//! Documents under a corpus directory are split, embedded and stored in a persisted
//! [`vector_store::VectorIndex`]. A [`agent::ConversationEngine`] runs each user turn against a
//! language model that may call the `search_knowledge_base` tool, and checkpoints the
//! conversation to a [`session::SessionStore`].

pub mod agent;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod knowledge;
pub mod model;
pub mod session;
pub mod tool;
pub mod utils;
pub mod value;
pub mod vector_store;

pub use config::Config;
pub use error::{Error, Result};
