//! Deterministic stand-ins for the model backends.

use std::{
    collections::{VecDeque, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
    sync::Arc,
};

use parking_lot::Mutex;
use serde_json::json;
use unicode_segmentation::UnicodeSegmentation as _;

use crate::{
    error::{Error, Result},
    model::{EmbeddingModel, InferenceConfig, LangModel},
    utils::BoxFuture,
    value::{Embedding, Message, ToolCall, ToolDesc},
};

pub(crate) const HASH_DIM: usize = 64;

/// Bag-of-words vector: every lowercased word increments one hashed bucket.
pub(crate) fn bag_of_words(text: &str) -> Embedding {
    let mut v = vec![0f32; HASH_DIM];
    for word in text.unicode_words() {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        v[(hasher.finish() % HASH_DIM as u64) as usize] += 1.0;
    }
    v.into()
}

pub(crate) fn hashing_embedding_model() -> EmbeddingModel {
    hashing_embedding_model_with_limit(usize::MAX)
}

pub(crate) fn hashing_embedding_model_with_limit(max_input_chars: usize) -> EmbeddingModel {
    EmbeddingModel::new_custom(
        Arc::new(|text: String| -> BoxFuture<'static, Result<Embedding>> {
            Box::pin(async move { Ok(bag_of_words(&text)) })
        }),
        max_input_chars,
    )
}

/// Fails on every text containing `poison`.
pub(crate) fn failing_embedding_model(poison: &'static str) -> EmbeddingModel {
    EmbeddingModel::new_custom(
        Arc::new(move |text: String| -> BoxFuture<'static, Result<Embedding>> {
            Box::pin(async move {
                if text.contains(poison) {
                    Err(Error::Embedding(format!("refused {:?}", poison)))
                } else {
                    Ok(bag_of_words(&text))
                }
            })
        }),
        usize::MAX,
    )
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDesc>,
}

/// A language model that replays queued responses and records every request.
#[derive(Clone)]
pub(crate) struct ScriptedLangModel {
    pub model: LangModel,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedLangModel {
    pub fn new(responses: impl IntoIterator<Item = Result<Message>>) -> Self {
        let queue = Arc::new(Mutex::new(responses.into_iter().collect::<VecDeque<_>>()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = calls.clone();
        let model = LangModel::new_custom(Arc::new(
            move |messages: Vec<Message>,
                  tools: Vec<ToolDesc>,
                  _config: InferenceConfig|
                  -> BoxFuture<'static, Result<Message>> {
                recorder.lock().push(RecordedCall { messages, tools });
                let next = queue
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| Err(Error::Completion("script exhausted".into())));
                Box::pin(async move { next })
            },
        ));
        Self { model, calls }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

/// Assistant message requesting each `(call_id, tool_name, query)`.
pub(crate) fn tool_request<'a>(
    calls: impl IntoIterator<Item = (impl Into<String>, &'a str, &'a str)>,
) -> Message {
    Message::assistant("").with_tool_calls(calls.into_iter().map(|(id, name, query)| {
        ToolCall::new(id, name).with_argument("query", json!(query))
    }))
}
