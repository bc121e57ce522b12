use std::sync::Arc;

use ragdesk_macros::async_behavior;
use serde_json::{Value, json};

use super::render::ResultRenderer;
use crate::{
    error::{Error, Result},
    model::EmbeddingModel,
    tool::ToolBehavior,
    utils::log,
    value::{ToolDesc, ToolDescBuilder},
    vector_store::ActiveIndex,
};

pub const KNOWLEDGE_TOOL_NAME: &str = "search_knowledge_base";

pub const DEFAULT_TOP_K: usize = 3;

fn default_desc() -> ToolDesc {
    ToolDescBuilder::new(KNOWLEDGE_TOOL_NAME)
        .description(
            "Use this tool to find information about technical problems, SSO settings, billing, \
             API or bugs in the company knowledge base. Input: a concrete search query.",
        )
        .parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to look up in the knowledge base."
                }
            },
            "required": ["query"]
        }))
        .build()
}

/// Retrieval over the active vector index, exposed to the model as `search_knowledge_base`.
#[derive(Clone)]
pub struct KnowledgeTool {
    index: Arc<ActiveIndex>,
    embedding_model: EmbeddingModel,
    top_k: usize,
    renderer: ResultRenderer,
    desc: ToolDesc,
}

impl std::fmt::Debug for KnowledgeTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeTool")
            .field("desc", &self.desc)
            .field("top_k", &self.top_k)
            .field("chunks", &self.index.current().len())
            .finish()
    }
}

impl KnowledgeTool {
    pub fn new(index: Arc<ActiveIndex>, embedding_model: EmbeddingModel) -> Self {
        Self {
            index,
            embedding_model,
            top_k: DEFAULT_TOP_K,
            renderer: ResultRenderer::new(),
            desc: default_desc(),
        }
    }

    pub fn with_top_k(self, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be at least 1".into()));
        }
        Ok(Self { top_k, ..self })
    }

    pub fn with_renderer(self, renderer: ResultRenderer) -> Self {
        Self { renderer, ..self }
    }

    pub fn with_description(self, desc: ToolDesc) -> Self {
        Self { desc, ..self }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Searches the index currently installed and renders the hits.
    pub async fn search(&self, query: &str) -> Result<String> {
        let index = self.index.current();
        let hits = index.search(&self.embedding_model, query, self.top_k).await?;
        log::debug(format!("{} hits for {:?}", hits.len(), query));
        self.renderer.render(query, &hits)
    }
}

#[async_behavior]
impl ToolBehavior for KnowledgeTool {
    fn get_description(&self) -> ToolDesc {
        self.desc.clone()
    }

    async fn run(&self, args: Value) -> Result<String> {
        let args = match args.as_object() {
            Some(a) => a,
            None => return Ok("Error: Invalid arguments: expected object".into()),
        };
        let query = match args.get("query") {
            Some(query) => match query.as_str() {
                Some(v) => v,
                None => return Ok("Error: Field `query` is not string".into()),
            },
            None => return Ok("Error: Missing required 'query' string".into()),
        };
        self.search(query).await
    }
}
