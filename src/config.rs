use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a technical support assistant. \
Look up answers in the knowledge base with the search_knowledge_base tool whenever the user \
asks about technical problems, SSO settings, billing, the API or bugs. \
Base your answer on the retrieved passages and say so when nothing relevant was found.";

/// Process-level settings. Every provider and store is constructed from these values
/// explicitly; nothing is kept in global state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub ollama_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,

    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    /// `None` keeps sessions in memory only.
    pub session_dir: Option<PathBuf>,
    pub session_id: String,

    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_concurrency: usize,
    pub embed_max_input_chars: usize,
    pub max_tool_cycles: usize,
    pub system_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".into(),
            chat_model: "qwen3:8b".into(),
            embedding_model: "nomic-embed-text".into(),
            temperature: 0.0,
            request_timeout_secs: 300,
            data_dir: PathBuf::from("./data"),
            index_dir: PathBuf::from("./index_store"),
            session_dir: None,
            session_id: "session_1".into(),
            top_k: 3,
            chunk_size: 1024,
            chunk_overlap: 200,
            embed_concurrency: 4,
            embed_max_input_chars: 8192,
            max_tool_cycles: 10,
            system_message: DEFAULT_SYSTEM_MESSAGE.into(),
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e)))
}

impl Config {
    pub fn ollama_base_url(&self) -> Result<Url> {
        Url::parse(&self.ollama_url)
            .map_err(|e| Error::Config(format!("ollama_url {:?}: {}", self.ollama_url, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Loads `.env` (when present) and applies `RAGDESK_*` overrides on top of the defaults.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!(".env: {}", e))),
        }
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Keys are the `RAGDESK_*` names.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        macro_rules! apply {
            ($key:literal, $field:expr) => {
                if let Some(raw) = lookup($key) {
                    $field = parse_var($key, &raw)?;
                }
            };
        }

        apply!("RAGDESK_OLLAMA_URL", self.ollama_url);
        apply!("RAGDESK_CHAT_MODEL", self.chat_model);
        apply!("RAGDESK_EMBEDDING_MODEL", self.embedding_model);
        apply!("RAGDESK_TEMPERATURE", self.temperature);
        apply!("RAGDESK_REQUEST_TIMEOUT_SECS", self.request_timeout_secs);
        apply!("RAGDESK_DATA_DIR", self.data_dir);
        apply!("RAGDESK_INDEX_DIR", self.index_dir);
        apply!("RAGDESK_SESSION_ID", self.session_id);
        apply!("RAGDESK_TOP_K", self.top_k);
        apply!("RAGDESK_CHUNK_SIZE", self.chunk_size);
        apply!("RAGDESK_CHUNK_OVERLAP", self.chunk_overlap);
        apply!("RAGDESK_EMBED_CONCURRENCY", self.embed_concurrency);
        apply!("RAGDESK_EMBED_MAX_INPUT_CHARS", self.embed_max_input_chars);
        apply!("RAGDESK_MAX_TOOL_CYCLES", self.max_tool_cycles);
        if let Some(raw) = lookup("RAGDESK_SESSION_DIR") {
            self.session_dir = (!raw.trim().is_empty()).then(|| PathBuf::from(raw.trim()));
        }
        if let Some(raw) = lookup("RAGDESK_SYSTEM_MESSAGE") {
            self.system_message = raw;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.ollama_base_url()?;
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be at least 1".into()));
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embed_concurrency == 0 {
            return Err(Error::Config("embed_concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.ollama_base_url().unwrap().as_str(), "http://localhost:11434/");
        assert_eq!(config.chat_model, "qwen3:8b");
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_tool_cycles, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::default()
            .with_overrides(lookup(&[
                ("RAGDESK_TOP_K", "5"),
                ("RAGDESK_OLLAMA_URL", "http://gpu-box:11434"),
                ("RAGDESK_SESSION_DIR", "/var/lib/ragdesk/sessions"),
                ("RAGDESK_TEMPERATURE", " 0.2 "),
            ]))
            .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(
            config.ollama_base_url().unwrap().host_str(),
            Some("gpu-box")
        );
        assert_eq!(
            config.session_dir,
            Some(PathBuf::from("/var/lib/ragdesk/sessions"))
        );
        assert_eq!(config.temperature, 0.2);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = Config::default()
            .with_overrides(lookup(&[("RAGDESK_TOP_K", "three")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("RAGDESK_TOP_K")));

        let err = Config::default()
            .with_overrides(lookup(&[("RAGDESK_CHUNK_OVERLAP", "2048")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::default()
            .with_overrides(lookup(&[("RAGDESK_OLLAMA_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("ollama_url")));
    }
}
