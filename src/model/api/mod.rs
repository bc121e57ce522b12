pub(crate) mod ollama;

pub use ollama::{OllamaClient, OllamaEmbeddingModel, OllamaLangModel};
