use std::path::Path;

use futures::StreamExt as _;

use super::index::VectorIndex;
use crate::{
    error::{Error, Result},
    ingest::DocumentIngestor,
    utils::log,
};

/// Ingests `corpus`, builds a fresh index and persists it at `location`.
///
/// `on_progress(comment, current, total)` is called for each embedded chunk.
pub async fn rebuild_with_progress(
    location: impl AsRef<Path>,
    corpus: impl AsRef<Path>,
    ingestor: &DocumentIngestor,
    mut on_progress: impl FnMut(&str, usize, usize),
) -> Result<VectorIndex> {
    let mut strm = ingestor.ingest_stream(corpus);
    let mut output = None;
    while let Some(progress) = strm.next().await {
        let progress = progress?;
        on_progress(
            &progress.comment,
            progress.current_task,
            progress.total_task,
        );
        if progress.result.is_some() {
            output = progress.result;
        }
    }
    let output = output
        .ok_or_else(|| Error::InvalidArgument("ingestion finished without a result".into()))?;

    let index = VectorIndex::build(output.into_chunks()?)?;
    index.persist(location).await?;
    Ok(index)
}

pub async fn rebuild(
    location: impl AsRef<Path>,
    corpus: impl AsRef<Path>,
    ingestor: &DocumentIngestor,
) -> Result<VectorIndex> {
    rebuild_with_progress(location, corpus, ingestor, |_, _, _| {}).await
}

/// Loads the index persisted at `location`, building and persisting it from `corpus` when
/// nothing has been persisted yet. Every other load failure is returned as is.
///
/// A loaded index must match the dimension the embedding model produces today.
pub async fn open_or_build_with_progress(
    location: impl AsRef<Path>,
    corpus: impl AsRef<Path>,
    ingestor: &DocumentIngestor,
    on_progress: impl FnMut(&str, usize, usize),
) -> Result<VectorIndex> {
    let location = location.as_ref();
    match VectorIndex::load(location).await {
        Ok(index) => {
            let dim = ingestor.embedding_model().probe_dimension().await?;
            if dim != index.dim() {
                return Err(Error::DimensionMismatch {
                    expected: index.dim(),
                    actual: dim,
                });
            }
            Ok(index)
        }
        Err(Error::NotFound { .. }) => {
            log::info(format!(
                "no index at {}, building from {}",
                location.display(),
                corpus.as_ref().display()
            ));
            rebuild_with_progress(location, corpus, ingestor, on_progress).await
        }
        Err(e) => Err(e),
    }
}

pub async fn open_or_build(
    location: impl AsRef<Path>,
    corpus: impl AsRef<Path>,
    ingestor: &DocumentIngestor,
) -> Result<VectorIndex> {
    open_or_build_with_progress(location, corpus, ingestor, |_, _, _| {}).await
}
