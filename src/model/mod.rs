pub(crate) mod api;
pub(crate) mod custom;
pub(crate) mod embedding_model;
pub(crate) mod language_model;

pub use api::{OllamaClient, OllamaEmbeddingModel, OllamaLangModel};
pub use custom::{CustomEmbeddingFunc, CustomLangModelInferFunc};
pub use embedding_model::{EmbeddingModel, EmbeddingModelInference};
pub use language_model::{InferenceConfig, LangModel, LangModelInference};
