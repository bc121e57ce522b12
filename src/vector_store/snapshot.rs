//! On-disk snapshot of a [`VectorIndex`].
//!
//! `<location>/index.snapshot` holds one JSON header line followed by the JSON array of
//! chunks:
//! ```text
//! {"format":"ragdesk-index","version":1,"dim":768,"count":42,"similarity":"cosine","checksum":"<sha1>"}
//! [{"id":"...","text":"...","metadata":{...},"embedding":[...]}, ...]
//! ```
//! The checksum covers every other header field and the payload. The file is replaced
//! atomically, so a reader sees either the previous snapshot or the new one in full.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use super::index::{Similarity, VectorIndex};
use crate::{
    error::{Error, Result},
    utils::{fs::write_atomic, log},
    value::DocumentChunk,
};

pub const SNAPSHOT_FILE: &str = "index.snapshot";
const FORMAT: &str = "ragdesk-index";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    format: String,
    version: u32,
    dim: usize,
    count: usize,
    similarity: Similarity,
    checksum: String,
}

impl SnapshotHeader {
    fn digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(
            format!(
                "{}\n{}\n{}\n{}\n{}\n",
                self.format, self.version, self.dim, self.count, self.similarity
            )
            .as_bytes(),
        );
        hasher.update(payload);
        hex::encode(hasher.finalize())
    }
}

pub fn snapshot_path(location: impl AsRef<Path>) -> PathBuf {
    location.as_ref().join(SNAPSHOT_FILE)
}

impl VectorIndex {
    pub async fn persist(&self, location: impl AsRef<Path>) -> Result<()> {
        let path = snapshot_path(&location);
        let payload = serde_json::to_vec(self.chunks())
            .map_err(|e| Error::InvalidArgument(format!("cannot serialize chunks: {}", e)))?;
        let mut header = SnapshotHeader {
            format: FORMAT.to_owned(),
            version: VERSION,
            dim: self.dim(),
            count: self.len(),
            similarity: self.similarity(),
            checksum: String::new(),
        };
        header.checksum = header.digest(&payload);
        let mut bytes = serde_json::to_vec(&header)
            .map_err(|e| Error::InvalidArgument(format!("cannot serialize header: {}", e)))?;
        bytes.push(b'\n');
        bytes.extend_from_slice(&payload);

        write_atomic(&path, bytes).await?;
        log::info(format!(
            "persisted index of {} chunks (dim {}) to {}",
            self.len(),
            self.dim(),
            path.display()
        ));
        Ok(())
    }

    pub async fn load(location: impl AsRef<Path>) -> Result<Self> {
        let path = snapshot_path(&location);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    path: location.as_ref().to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| Error::corrupt(&path, "missing header line"))?;
        let (header, payload) = (&bytes[..split], &bytes[split + 1..]);

        let header: SnapshotHeader = serde_json::from_slice(header)
            .map_err(|e| Error::corrupt(&path, format!("unreadable header: {}", e)))?;
        if header.format != FORMAT {
            return Err(Error::corrupt(
                &path,
                format!("unknown format {:?}", header.format),
            ));
        }
        if header.version != VERSION {
            return Err(Error::corrupt(
                &path,
                format!(
                    "unsupported version {} (expected {})",
                    header.version, VERSION
                ),
            ));
        }
        if header.digest(payload) != header.checksum {
            return Err(Error::corrupt(&path, "checksum mismatch"));
        }

        let chunks: Vec<DocumentChunk> = serde_json::from_slice(payload)
            .map_err(|e| Error::corrupt(&path, format!("unreadable payload: {}", e)))?;
        if chunks.len() != header.count {
            return Err(Error::corrupt(
                &path,
                format!(
                    "header declares {} chunks, payload has {}",
                    header.count,
                    chunks.len()
                ),
            ));
        }
        let index = VectorIndex::build_with(chunks, header.similarity)
            .map_err(|e| Error::corrupt(&path, e))?;
        if index.dim() != header.dim {
            return Err(Error::corrupt(
                &path,
                format!(
                    "header declares dimension {}, payload has {}",
                    header.dim,
                    index.dim()
                ),
            ));
        }

        log::info(format!(
            "loaded index of {} chunks (dim {}) from {}",
            index.len(),
            index.dim(),
            path.display()
        ));
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use ragdesk_macros::logged_test;

    use super::*;
    use crate::{
        ingest::DocumentIngestor,
        utils::testing::{bag_of_words, hashing_embedding_model},
    };

    async fn sample_index() -> anyhow::Result<(tempfile::TempDir, VectorIndex)> {
        let dir = tempfile::tempdir()?;
        let corpus = dir.path().join("data");
        tokio::fs::create_dir_all(&corpus).await?;
        tokio::fs::write(
            corpus.join("errors.md"),
            "Error 429 means rate limiting; retry after 60 seconds.",
        )
        .await?;
        tokio::fs::write(
            corpus.join("sso.md"),
            "Single sign-on needs a SAML certificate. Upload it in the admin console.",
        )
        .await?;
        tokio::fs::write(
            corpus.join("billing.md"),
            "Invoices are issued monthly. Refunds take five business days.",
        )
        .await?;
        let ingestor = DocumentIngestor::new(hashing_embedding_model(), 40, 10)?;
        let chunks = ingestor.ingest(&corpus).await?.into_chunks()?;
        Ok((dir, VectorIndex::build(chunks)?))
    }

    #[logged_test]
    async fn round_trip_preserves_search_results() -> anyhow::Result<()> {
        let (dir, index) = sample_index().await?;
        let location = dir.path().join("index_store");
        index.persist(&location).await?;
        let loaded = VectorIndex::load(&location).await?;

        assert_eq!(loaded.chunks(), index.chunks());
        for query in ["error 429", "SAML certificate", "refund", "nothing related"] {
            let q = bag_of_words(query);
            let ids = |results: Vec<crate::vector_store::ScoredChunk>| {
                results.into_iter().map(|r| r.chunk.id).collect::<Vec<_>>()
            };
            assert_eq!(
                ids(loaded.search_embedding(&q, 3)?),
                ids(index.search_embedding(&q, 3)?)
            );
        }
        Ok(())
    }

    #[logged_test]
    async fn never_persisted_is_not_found() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = VectorIndex::load(dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        let err = VectorIndex::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }

    #[logged_test]
    async fn tampered_snapshots_are_corrupt() -> anyhow::Result<()> {
        let (dir, index) = sample_index().await?;
        let location = dir.path().join("index_store");
        index.persist(&location).await?;
        let path = snapshot_path(&location);
        let original = tokio::fs::read_to_string(&path).await?;

        let cases = [
            "not a snapshot at all".to_owned(),
            original.replacen("\"version\":1", "\"version\":2", 1),
            original.replacen("ragdesk-index", "other-index", 1),
            original.replacen("rate limiting", "rate limiting!", 1),
            original.replacen("\"similarity\":\"cosine\"", "\"similarity\":\"inner_product\"", 1),
            original.split('\n').next().unwrap_or_default().to_owned(),
        ];
        for content in cases {
            tokio::fs::write(&path, &content).await?;
            let err = VectorIndex::load(&location).await.unwrap_err();
            assert!(
                matches!(err, Error::CorruptIndex { .. }),
                "unexpected {err:?}"
            );
        }
        Ok(())
    }

    #[logged_test]
    async fn rejected_embeddings_never_reach_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let chunk = |id: &str, v: Vec<f32>| {
            DocumentChunk::new(id, id, crate::value::ChunkMetadata::new(), v.into())
        };
        let built = VectorIndex::build_with(
            vec![chunk("nan", vec![f32::NAN, 0.0]), chunk("ok", vec![0.1, 0.0])],
            Similarity::InnerProduct,
        );
        assert!(matches!(built, Err(Error::InvalidArgument(_))));

        let index = VectorIndex::build_with(
            vec![chunk("tiny", vec![f32::MIN_POSITIVE, 0.0]), chunk("ok", vec![0.1, 0.0])],
            Similarity::InnerProduct,
        )?;
        index.persist(dir.path()).await?;
        let loaded = VectorIndex::load(dir.path()).await?;
        assert_eq!(loaded.chunks(), index.chunks());
        assert_eq!(loaded.similarity(), Similarity::InnerProduct);
        Ok(())
    }

    #[logged_test]
    async fn persist_replaces_previous_snapshot() -> anyhow::Result<()> {
        let (dir, index) = sample_index().await?;
        let location = dir.path().join("index_store");
        index.persist(&location).await?;

        let smaller = VectorIndex::build(index.chunks()[..1].to_vec())?;
        smaller.persist(&location).await?;
        assert_eq!(VectorIndex::load(&location).await?.len(), 1);

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&location).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![SNAPSHOT_FILE.to_owned()]);
        Ok(())
    }
}
