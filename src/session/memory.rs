use std::collections::HashMap;

use parking_lot::RwLock;
use ragdesk_macros::async_behavior;

use super::{Session, SessionStore};
use crate::{error::Result, value::Message};

/// Keeps sessions in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_behavior]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().get(id).map(|messages| Session {
            id: id.to_owned(),
            messages: messages.clone(),
        }))
    }

    async fn put(&self, session: Session) -> Result<()> {
        self.sessions.write().insert(session.id, session.messages);
        Ok(())
    }

    async fn append(&self, id: &str, messages: Vec<Message>) -> Result<()> {
        self.sessions
            .write()
            .entry(id.to_owned())
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.write().remove(id).is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.sessions.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ragdesk_macros::logged_test;

    use super::*;
    use crate::session::conformance;

    #[logged_test]
    async fn behaves_as_a_session_store() -> anyhow::Result<()> {
        conformance::exercise(Arc::new(InMemorySessionStore::new())).await
    }

    #[logged_test]
    async fn concurrent_appends_are_not_lost() -> anyhow::Result<()> {
        conformance::concurrent_appends(Arc::new(InMemorySessionStore::new())).await
    }
}
