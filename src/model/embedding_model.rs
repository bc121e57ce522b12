use std::{sync::Arc, time::Duration};

use ragdesk_macros::{async_behavior, thread_safe};

use crate::{
    error::{Error, Provider, Result},
    model::{
        api::{OllamaClient, OllamaEmbeddingModel},
        custom::{CustomEmbeddingFunc, CustomEmbeddingModel},
    },
    value::Embedding,
};

#[thread_safe]
#[async_behavior]
pub trait EmbeddingModelInference {
    async fn infer(&self, text: String) -> Result<Embedding>;

    /// Longest input, in characters, the backend accepts in one call.
    fn max_input_chars(&self) -> usize {
        usize::MAX
    }
}

#[derive(Clone)]
enum EmbeddingModelInner {
    Ollama(OllamaEmbeddingModel),
    Custom(CustomEmbeddingModel),
}

/// Cloneable handle over an embedding backend.
///
/// When a timeout is set, every call that outlives it fails with
/// [`Error::ProviderTimeout`] instead of hanging the caller.
#[derive(Clone)]
pub struct EmbeddingModel {
    inner: EmbeddingModelInner,
    timeout: Option<Duration>,
}

impl EmbeddingModel {
    pub fn new_ollama(
        client: OllamaClient,
        model: impl Into<String>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            inner: EmbeddingModelInner::Ollama(OllamaEmbeddingModel::new(
                client,
                model,
                max_input_chars,
            )),
            timeout: None,
        }
    }

    pub fn new_custom(f: Arc<CustomEmbeddingFunc>, max_input_chars: usize) -> Self {
        Self {
            inner: EmbeddingModelInner::Custom(CustomEmbeddingModel {
                embed_func: f,
                max_input_chars,
            }),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Embeds a fixed probe text and returns the vector length the backend produces.
    pub async fn probe_dimension(&self) -> Result<usize> {
        let embedding = self.infer("dimension probe".to_owned()).await?;
        if embedding.is_empty() {
            return Err(Error::Embedding("backend returned an empty vector".into()));
        }
        Ok(embedding.len())
    }
}

#[async_behavior]
impl EmbeddingModelInference for EmbeddingModel {
    async fn infer(&self, text: String) -> Result<Embedding> {
        let fut = match &self.inner {
            EmbeddingModelInner::Ollama(model) => model.infer(text),
            EmbeddingModelInner::Custom(model) => model.infer(text),
        };
        match self.timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| Error::ProviderTimeout {
                    provider: Provider::Embedding,
                    after,
                })?,
            None => fut.await,
        }
    }

    fn max_input_chars(&self) -> usize {
        match &self.inner {
            EmbeddingModelInner::Ollama(model) => model.max_input_chars(),
            EmbeddingModelInner::Custom(model) => model.max_input_chars(),
        }
    }
}
