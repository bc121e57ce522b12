pub(crate) mod active;
pub(crate) mod bootstrap;
pub(crate) mod index;
pub(crate) mod snapshot;

pub use active::ActiveIndex;
pub use bootstrap::{open_or_build, open_or_build_with_progress, rebuild, rebuild_with_progress};
pub use index::{ScoredChunk, Similarity, VectorIndex};
pub use snapshot::{SNAPSHOT_FILE, snapshot_path};
