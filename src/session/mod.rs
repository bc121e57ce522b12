mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;
use ragdesk_macros::{async_behavior, thread_safe};
use serde::{Deserialize, Serialize};

use crate::{error::Result, value::Message};

/// The message history of one conversation thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }
}

/// Checkpoint storage keyed by session id.
///
/// Reads observe every write previously made to the same id. Operations on distinct ids
/// never interfere with each other.
#[thread_safe]
#[async_behavior]
pub trait SessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>>;

    /// Stores `session`, replacing whatever was kept under its id.
    async fn put(&self, session: Session) -> Result<()>;

    /// Appends `messages` to the session, creating it when absent.
    async fn append(&self, id: &str, messages: Vec<Message>) -> Result<()>;

    /// Returns whether a session was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn list_ids(&self) -> Result<Vec<String>>;
}
