use std::sync::Arc;

use parking_lot::RwLock;

use super::index::VectorIndex;
use crate::utils::log;

/// The index currently served to readers.
///
/// Readers take an `Arc` snapshot and search it lock-free; a rebuild installs a new index with
/// [`ActiveIndex::swap`]. In-flight searches keep the handle they started with.
#[derive(Debug)]
pub struct ActiveIndex {
    current: RwLock<Arc<VectorIndex>>,
}

impl ActiveIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        self.current.read().clone()
    }

    /// Installs `next` and returns the index it replaced.
    pub fn swap(&self, next: VectorIndex) -> Arc<VectorIndex> {
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut *self.current.write(), next.clone());
        log::info(format!(
            "swapped active index: {} chunks -> {} chunks",
            previous.len(),
            next.len()
        ));
        previous
    }
}

impl From<VectorIndex> for ActiveIndex {
    fn from(index: VectorIndex) -> Self {
        Self::new(index)
    }
}
