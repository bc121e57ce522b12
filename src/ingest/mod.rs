pub(crate) mod reader;
pub(crate) mod splitter;

use std::path::Path;

use futures::StreamExt as _;

pub use reader::{Corpus, SkippedFile, SourceDocument, read_corpus};
pub use splitter::{TextSpan, TextSplitter};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{EmbeddingModel, EmbeddingModelInference as _},
    utils::{BoxStream, log},
    value::{
        ChunkMetadata, DocumentChunk, META_CHAR_OFFSET, META_CHUNK_INDEX, META_FILE_NAME,
        META_SOURCE,
    },
};

/// Progress report emitted while a corpus is being embedded. The last item carries the result.
#[derive(Debug)]
pub struct IngestProgress<T> {
    pub comment: String,
    pub current_task: usize,
    pub total_task: usize,
    pub result: Option<T>,
}

/// A chunk whose embedding call failed. It is left out of the index.
#[derive(Debug)]
pub struct IngestFailure {
    pub source: String,
    pub chunk_index: usize,
    pub char_offset: usize,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct IngestOutput {
    pub chunks: Vec<DocumentChunk>,
    pub failures: Vec<IngestFailure>,
    pub skipped: Vec<SkippedFile>,
}

impl IngestOutput {
    /// Chunks ready for indexing. When every chunk failed, the first embedding error is
    /// returned instead so callers do not mistake a dead backend for an empty corpus.
    pub fn into_chunks(self) -> Result<Vec<DocumentChunk>> {
        if self.chunks.is_empty()
            && let Some(first) = self.failures.into_iter().next()
        {
            return Err(first.error);
        }
        Ok(self.chunks)
    }
}

struct PendingChunk {
    source: String,
    file_name: String,
    chunk_index: usize,
    span: TextSpan,
}

impl PendingChunk {
    fn metadata(&self) -> ChunkMetadata {
        let mut metadata = ChunkMetadata::new();
        metadata.insert(META_SOURCE.into(), self.source.clone());
        metadata.insert(META_FILE_NAME.into(), self.file_name.clone());
        metadata.insert(META_CHUNK_INDEX.into(), self.chunk_index.to_string());
        metadata.insert(META_CHAR_OFFSET.into(), self.span.char_offset.to_string());
        metadata
    }
}

/// Turns a directory of text files into embedded [`DocumentChunk`]s.
#[derive(Clone)]
pub struct DocumentIngestor {
    embedding_model: EmbeddingModel,
    splitter: TextSplitter,
    concurrency: usize,
}

impl DocumentIngestor {
    /// The chunk size is clamped to the embedding model's input limit. When clamping kicks
    /// in, the overlap shrinks by the same ratio.
    pub fn new(
        embedding_model: EmbeddingModel,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self> {
        let limit = embedding_model.max_input_chars();
        let (chunk_size, chunk_overlap) = if chunk_size > limit {
            let scaled = (chunk_overlap as u128 * limit as u128 / chunk_size as u128) as usize;
            log::debug(format!(
                "chunk size {} exceeds the embedding input limit; using {}",
                chunk_size, limit
            ));
            (limit, scaled.min(limit.saturating_sub(1)))
        } else {
            (chunk_size, chunk_overlap)
        };
        Ok(Self {
            embedding_model,
            splitter: TextSplitter::new(chunk_size, chunk_overlap)?,
            concurrency: 1,
        })
    }

    pub fn from_config(embedding_model: EmbeddingModel, config: &Config) -> Result<Self> {
        Ok(Self::new(embedding_model, config.chunk_size, config.chunk_overlap)?
            .with_concurrency(config.embed_concurrency))
    }

    /// Number of embedding calls kept in flight. Output order does not depend on it.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    pub fn embedding_model(&self) -> &EmbeddingModel {
        &self.embedding_model
    }

    pub async fn ingest(&self, corpus: impl AsRef<Path>) -> Result<IngestOutput> {
        let mut strm = self.ingest_stream(corpus);
        while let Some(progress) = strm.next().await {
            if let Some(output) = progress?.result {
                return Ok(output);
            }
        }
        Err(Error::InvalidArgument(
            "ingestion finished without a result".into(),
        ))
    }

    pub fn ingest_stream<'a>(
        &'a self,
        corpus: impl AsRef<Path>,
    ) -> BoxStream<'a, Result<IngestProgress<IngestOutput>>> {
        let corpus = corpus.as_ref().to_path_buf();
        Box::pin(async_stream::try_stream! {
            let Corpus { documents, skipped } = read_corpus(&corpus).await?;

            let mut pending = Vec::new();
            for doc in &documents {
                for (chunk_index, span) in self.splitter.split(&doc.text).into_iter().enumerate() {
                    pending.push(PendingChunk {
                        source: doc.source.clone(),
                        file_name: doc.file_name.clone(),
                        chunk_index,
                        span,
                    });
                }
            }
            let total = pending.len();
            yield IngestProgress {
                comment: format!("read {} documents into {} chunks", documents.len(), total),
                current_task: 0,
                total_task: total,
                result: None,
            };

            let model = &self.embedding_model;
            let mut embedded = Box::pin(
                futures::stream::iter(pending.into_iter().map(|p| async move {
                    let result = model.infer(p.span.text.clone()).await;
                    (p, result)
                }))
                .buffered(self.concurrency),
            );

            let mut output = IngestOutput {
                skipped,
                ..Default::default()
            };
            let mut current = 0;
            while let Some((p, result)) = embedded.next().await {
                current += 1;
                let result = result.and_then(|embedding| {
                    if embedding.is_finite() {
                        Ok(embedding)
                    } else {
                        Err(Error::Embedding("non-finite component in embedding".into()))
                    }
                });
                match result {
                    Ok(embedding) => {
                        let id = DocumentChunk::derive_id(&p.source, p.span.char_offset);
                        let metadata = p.metadata();
                        output.chunks.push(DocumentChunk::new(id, p.span.text, metadata, embedding));
                    }
                    Err(error) => {
                        log::warn(format!(
                            "embedding failed for {} chunk {}: {}",
                            p.source, p.chunk_index, error
                        ));
                        output.failures.push(IngestFailure {
                            source: p.source.clone(),
                            chunk_index: p.chunk_index,
                            char_offset: p.span.char_offset,
                            error,
                        });
                    }
                }
                yield IngestProgress {
                    comment: format!("embedded {}", p.source),
                    current_task: current,
                    total_task: total,
                    result: None,
                };
            }

            log::info(format!(
                "ingested {} chunks from {} documents ({} chunk failures, {} files skipped)",
                output.chunks.len(),
                documents.len(),
                output.failures.len(),
                output.skipped.len()
            ));
            yield IngestProgress {
                comment: "done".to_owned(),
                current_task: total,
                total_task: total,
                result: Some(output),
            };
        })
    }
}
