use std::path::{Path, PathBuf};

use ragdesk_macros::async_behavior;
use sha1::{Digest, Sha1};

use super::{Session, SessionStore};
use crate::{
    error::{Error, Result},
    utils::{KeyedLocks, fs, log},
    value::Message,
};

/// Stores each session as a JSON file under one directory.
///
/// Files are named by the SHA-1 hex digest of the session id, so arbitrary ids map to
/// safe file names. Every write replaces the file atomically.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Default::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let digest = hex::encode(Sha1::digest(id.as_bytes()));
        self.dir.join(format!("{}.json", digest))
    }

    async fn read(&self, path: &Path) -> Result<Option<Session>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::Session(format!("{}: {}", path.display(), e)))
    }

    async fn write(&self, session: &Session) -> Result<()> {
        let data = serde_json::to_vec_pretty(session)
            .map_err(|e| Error::Session(format!("session {:?}: {}", session.id, e)))?;
        fs::write_atomic(self.path_for(&session.id), data).await?;
        Ok(())
    }
}

#[async_behavior]
impl SessionStore for FileSessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>> {
        self.read(&self.path_for(id)).await
    }

    async fn put(&self, session: Session) -> Result<()> {
        let _guard = self.locks.lock(&session.id).await;
        self.write(&session).await
    }

    async fn append(&self, id: &str, messages: Vec<Message>) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        let mut session = self
            .read(&self.path_for(id))
            .await?
            .unwrap_or_else(|| Session::new(id));
        session.messages.extend(messages);
        self.write(&session).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.locks.lock(id).await;
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(session)) => ids.push(session.id),
                Ok(None) => {}
                Err(e) => log::warn(format!("skipping unreadable session file: {}", e)),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
