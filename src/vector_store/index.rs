use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use strum_macros::Display;

use crate::{
    error::{Error, Result},
    model::{EmbeddingModel, EmbeddingModelInference as _},
    utils::Normalize as _,
    value::{DocumentChunk, Embedding},
};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Similarity {
    /// Inner product of unit-normalised vectors.
    #[default]
    Cosine,
    InnerProduct,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Immutable exact-search index over embedded chunks.
///
/// Built once, then shared read-only. A rebuilt corpus yields a new `VectorIndex`; see
/// [`super::ActiveIndex`] for swapping the one in use.
#[derive(Clone, Debug)]
pub struct VectorIndex {
    chunks: Vec<DocumentChunk>,
    // What queries are scored against: normalised under cosine, raw otherwise.
    vectors: Vec<Embedding>,
    dim: usize,
    similarity: Similarity,
}

impl VectorIndex {
    pub fn build(chunks: Vec<DocumentChunk>) -> Result<Self> {
        Self::build_with(chunks, Similarity::default())
    }

    pub fn build_with(chunks: Vec<DocumentChunk>, similarity: Similarity) -> Result<Self> {
        let Some(first) = chunks.first() else {
            return Err(Error::EmptyCorpus);
        };
        let dim = first.embedding.len();
        if dim == 0 {
            return Err(Error::InvalidArgument(format!(
                "chunk {} has an empty embedding",
                first.id
            )));
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: bad.embedding.len(),
            });
        }
        if let Some(bad) = chunks.iter().find(|c| !c.embedding.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "chunk {} has a non-finite embedding component",
                bad.id
            )));
        }

        let vectors = chunks
            .iter()
            .map(|c| match similarity {
                Similarity::Cosine => c.embedding.normalized(),
                Similarity::InnerProduct => c.embedding.clone(),
            })
            .collect();
        Ok(Self {
            chunks,
            vectors,
            dim,
            similarity,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    fn check_k(k: usize) -> Result<()> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        Ok(())
    }

    /// Top-`k` chunks for an already embedded query.
    ///
    /// Scores descend; equal scores keep insertion order and NaN scores sort last.
    pub fn search_embedding(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredChunk>> {
        Self::check_k(k)?;
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let query = match self.similarity {
            Similarity::Cosine => query.normalized(),
            Similarity::InnerProduct => query.clone(),
        };
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .map(|v| v.dot(&query))
            .enumerate()
            .collect();
        scored.sort_by(|(ia, a), (ib, b)| {
            let key = |s: f32| OrderedFloat(if s.is_nan() { f32::NEG_INFINITY } else { s });
            key(*b).cmp(&key(*a)).then(ia.cmp(ib))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    /// Embeds `query` and returns its top-`k` chunks.
    pub async fn search(
        &self,
        model: &EmbeddingModel,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Self::check_k(k)?;
        let embedding = model.infer(query.to_owned()).await?;
        self.search_embedding(&embedding, k)
    }
}

#[cfg(test)]
mod tests {
    use ragdesk_macros::logged_test;

    use super::*;
    use crate::{
        utils::testing::{bag_of_words, hashing_embedding_model},
        value::ChunkMetadata,
    };

    fn chunk(id: &str, v: Vec<f32>) -> DocumentChunk {
        DocumentChunk::new(id, id, ChunkMetadata::new(), v.into())
    }

    fn text_chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new(
            DocumentChunk::derive_id(text, 0),
            text,
            ChunkMetadata::new(),
            bag_of_words(text),
        )
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(VectorIndex::build(vec![]), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let err = VectorIndex::build(vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![1.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(matches!(
            VectorIndex::build(vec![chunk("a", vec![])]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn results_descend_and_ties_keep_insertion_order() {
        let index = VectorIndex::build(vec![
            chunk("far", vec![0.0, 1.0]),
            chunk("tie-1", vec![1.0, 1.0]),
            chunk("near", vec![1.0, 0.0]),
            chunk("tie-2", vec![2.0, 2.0]),
        ])
        .unwrap();
        let ids: Vec<_> = index
            .search_embedding(&vec![1.0, 0.0].into(), 4)
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.id)
            .collect();
        assert_eq!(ids, vec!["near", "tie-1", "tie-2", "far"]);
    }

    #[yare::parameterized(
        fewer_than_len = { 2, 2 },
        equal_to_len = { 3, 3 },
        more_than_len = { 10, 3 },
    )]
    fn never_more_than_k_or_len(k: usize, expected: usize) {
        let index = VectorIndex::build(vec![
            chunk("a", vec![1.0, 0.0]),
            chunk("b", vec![0.5, 0.5]),
            chunk("c", vec![0.0, 1.0]),
        ])
        .unwrap();
        let results = index.search_embedding(&vec![1.0, 0.2].into(), k).unwrap();
        assert_eq!(results.len(), expected);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn non_finite_embeddings_are_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = VectorIndex::build_with(
                vec![chunk("bad", vec![bad, 0.0]), chunk("ok", vec![0.1, 0.0])],
                Similarity::InnerProduct,
            )
            .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("bad")));
        }
    }

    #[test]
    fn inner_product_keeps_magnitude() {
        let index = VectorIndex::build_with(
            vec![chunk("small", vec![1.0, 0.0]), chunk("big", vec![3.0, 3.0])],
            Similarity::InnerProduct,
        )
        .unwrap();
        let results = index.search_embedding(&vec![1.0, 0.0].into(), 1).unwrap();
        assert_eq!(results[0].chunk.id, "big");
        assert_eq!(results[0].score, 3.0);
    }

    #[test]
    fn bad_queries_are_rejected() {
        let index = VectorIndex::build(vec![chunk("a", vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            index.search_embedding(&vec![1.0, 0.0].into(), 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            index.search_embedding(&vec![1.0].into(), 1),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[logged_test]
    async fn own_text_ranks_first() -> anyhow::Result<()> {
        let texts = [
            "Error 429 means rate limiting; retry after 60 seconds.",
            "Configure SAML single sign-on from the admin console.",
            "Invoices are issued on the first day of each month.",
            "The REST API accepts JSON bodies up to 10 MB.",
        ];
        let index = VectorIndex::build(texts.iter().map(|t| text_chunk(t)).collect())?;
        let model = hashing_embedding_model();
        for text in texts {
            let results = index.search(&model, text, 3).await?;
            assert_eq!(results[0].chunk.text, text);
            assert!((results[0].score - 1.0).abs() < 1e-5);
        }
        Ok(())
    }
}
