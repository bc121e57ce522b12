//! Ollama REST dialect: `/api/embed` for embeddings and non-streaming `/api/chat` for
//! completions with tool calling.

use std::time::Duration;

use ragdesk_macros::async_behavior;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use url::Url;

use crate::{
    config::Config,
    error::{Error, Provider, Result},
    model::{
        embedding_model::EmbeddingModelInference,
        language_model::{InferenceConfig, LangModelInference},
    },
    value::{Embedding, Message, ToolCall, ToolDesc},
};

/// Shared HTTP client bound to one Ollama server.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(mut base: Url, timeout: Duration) -> Result<Self> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.ollama_base_url()?, config.request_timeout())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("endpoint {}: {}", path, e)))
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
        map_err: impl Fn(reqwest::Error) -> Error,
    ) -> Result<Value> {
        let url = self.endpoint(path)?;
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(&map_err)?;
        resp.json::<Value>().await.map_err(map_err)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Clone, Debug)]
pub struct OllamaEmbeddingModel {
    client: OllamaClient,
    model: String,
    max_input_chars: usize,
}

impl OllamaEmbeddingModel {
    pub fn new(client: OllamaClient, model: impl Into<String>, max_input_chars: usize) -> Self {
        Self {
            client,
            model: model.into(),
            max_input_chars,
        }
    }
}

#[async_behavior]
impl EmbeddingModelInference for OllamaEmbeddingModel {
    async fn infer(&self, text: String) -> Result<Embedding> {
        let body = serde_json::to_value(EmbedRequest {
            model: &self.model,
            input: &text,
        })
        .map_err(|e| Error::Embedding(e.to_string()))?;
        let resp = self
            .client
            .post("api/embed", &body, |e| {
                if e.is_timeout() {
                    Error::ProviderTimeout {
                        provider: Provider::Embedding,
                        after: self.client.timeout,
                    }
                } else {
                    Error::Embedding(e.to_string())
                }
            })
            .await?;
        let resp: EmbedResponse =
            serde_json::from_value(resp).map_err(|e| Error::Embedding(e.to_string()))?;
        match resp.embeddings.into_iter().next() {
            Some(v) if !v.is_empty() => Ok(v.into()),
            _ => Err(Error::Embedding(format!(
                "model {} returned no embedding",
                self.model
            ))),
        }
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }
}

#[derive(Clone, Debug)]
pub struct OllamaLangModel {
    client: OllamaClient,
    model: String,
}

impl OllamaLangModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_behavior]
impl LangModelInference for OllamaLangModel {
    async fn infer(
        &self,
        msgs: Vec<Message>,
        tools: Vec<ToolDesc>,
        config: InferenceConfig,
    ) -> Result<Message> {
        let body = make_chat_request(&self.model, &msgs, &tools, &config);
        let resp = self
            .client
            .post("api/chat", &body, |e| {
                if e.is_timeout() {
                    Error::CompletionTimeout {
                        after: self.client.timeout,
                    }
                } else {
                    Error::Completion(e.to_string())
                }
            })
            .await?;
        parse_chat_response(&resp)
    }
}

fn marshal_message(msg: &Message) -> Value {
    match msg {
        Message::System { content } => json!({"role": "system", "content": content}),
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut out = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                out["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.call_id,
                            "function": {"name": call.tool_name, "arguments": call.arguments}
                        })
                    })
                    .collect();
            }
            out
        }
        Message::ToolResult {
            tool_name, content, ..
        } => json!({"role": "tool", "tool_name": tool_name, "content": content}),
    }
}

fn marshal_tool(desc: &ToolDesc) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": desc.name,
            "description": desc.description.clone().unwrap_or_default(),
            "parameters": desc.parameters,
        }
    })
}

pub(crate) fn make_chat_request(
    model: &str,
    msgs: &[Message],
    tools: &[ToolDesc],
    config: &InferenceConfig,
) -> Value {
    let mut options = Map::new();
    if let Some(temperature) = config.temperature {
        options.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = config.max_tokens {
        options.insert("num_predict".into(), json!(max_tokens));
    }

    let mut body = json!({
        "model": model,
        "messages": msgs.iter().map(marshal_message).collect::<Vec<_>>(),
        "stream": false,
        "options": options,
    });
    if !tools.is_empty() {
        body["tools"] = tools.iter().map(marshal_tool).collect();
    }
    body
}

fn parse_arguments(raw: Option<&Value>) -> Result<Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(Error::Completion(format!(
                "tool call arguments are not a JSON object: {}",
                s
            ))),
        },
        Some(other) => Err(Error::Completion(format!(
            "tool call arguments are not a JSON object: {}",
            other
        ))),
    }
}

pub(crate) fn parse_chat_response(resp: &Value) -> Result<Message> {
    let message = resp
        .get("message")
        .ok_or_else(|| Error::Completion(format!("response carries no message: {}", resp)))?;
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(strip_think)
        .unwrap_or_default();

    let mut calls = Vec::new();
    if let Some(raw_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for raw in raw_calls {
            let function = raw.get("function").unwrap_or(raw);
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Completion(format!("tool call without a name: {}", raw)))?;
            let call_id = raw
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            calls.push(
                ToolCall::new(call_id, name)
                    .with_arguments(parse_arguments(function.get("arguments"))?),
            );
        }
    }

    Ok(Message::assistant(content).with_tool_calls(calls))
}

/// Drops `<think>...</think>` reasoning blocks. An unterminated block swallows the rest.
pub(crate) fn strip_think(content: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        match rest[start + OPEN.len()..].find(CLOSE) {
            Some(end) => rest = &rest[start + OPEN.len() + end + CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_owned()
}
