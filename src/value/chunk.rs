use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::value::Embedding;

/// Ordered string metadata attached to a chunk for citations.
pub type ChunkMetadata = IndexMap<String, String>;

pub const META_SOURCE: &str = "source";
pub const META_FILE_NAME: &str = "file_name";
pub const META_CHUNK_INDEX: &str = "chunk_index";
pub const META_CHAR_OFFSET: &str = "char_offset";

/// A span of source text together with its embedding. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
    pub embedding: Embedding,
}

impl DocumentChunk {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: ChunkMetadata,
        embedding: Embedding,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            embedding,
        }
    }

    /// Deterministic id: the first 16 hex digits of SHA-1 over `source:char_offset`.
    pub fn derive_id(source: &str, char_offset: usize) -> String {
        let mut hasher = Sha1::new();
        hasher.update(source.as_bytes());
        hasher.update(b":");
        hasher.update(char_offset.to_string().as_bytes());
        let mut id = hex::encode(hasher.finalize());
        id.truncate(16);
        id
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }

    pub fn chunk_index(&self) -> Option<usize> {
        self.metadata
            .get(META_CHUNK_INDEX)
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable_and_distinct() {
        let a = DocumentChunk::derive_id("faq/errors.md", 0);
        assert_eq!(a.len(), 16);
        assert_eq!(a, DocumentChunk::derive_id("faq/errors.md", 0));
        assert_ne!(a, DocumentChunk::derive_id("faq/errors.md", 824));
        assert_ne!(a, DocumentChunk::derive_id("faq/billing.md", 0));
    }
}
