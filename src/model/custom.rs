use std::sync::Arc;

use ragdesk_macros::{async_behavior, thread_safe};

use super::{
    embedding_model::EmbeddingModelInference,
    language_model::{InferenceConfig, LangModelInference},
};
use crate::{
    error::Result,
    utils::BoxFuture,
    value::{Embedding, Message, ToolDesc},
};

#[thread_safe]
pub type CustomEmbeddingFunc = dyn Fn(String) -> BoxFuture<'static, Result<Embedding>>;

#[thread_safe]
pub type CustomLangModelInferFunc =
    dyn Fn(Vec<Message>, Vec<ToolDesc>, InferenceConfig) -> BoxFuture<'static, Result<Message>>;

#[derive(Clone)]
pub(super) struct CustomEmbeddingModel {
    pub embed_func: Arc<CustomEmbeddingFunc>,
    pub max_input_chars: usize,
}

#[async_behavior]
impl EmbeddingModelInference for CustomEmbeddingModel {
    async fn infer(&self, text: String) -> Result<Embedding> {
        (self.embed_func)(text).await
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }
}

#[derive(Clone)]
pub(super) struct CustomLangModel {
    pub infer_func: Arc<CustomLangModelInferFunc>,
}

#[async_behavior]
impl LangModelInference for CustomLangModel {
    async fn infer(
        &self,
        msgs: Vec<Message>,
        tools: Vec<ToolDesc>,
        config: InferenceConfig,
    ) -> Result<Message> {
        (self.infer_func)(msgs, tools, config).await
    }
}
