mod function;

use std::{fmt::Debug, sync::Arc};

pub use function::*;
use ragdesk_macros::{async_behavior, thread_safe};
use serde_json::Value;

use crate::{error::Result, knowledge::KnowledgeTool, utils::log, value::ToolDesc};

#[thread_safe]
#[async_behavior]
pub trait ToolBehavior: Debug + Clone {
    fn get_description(&self) -> ToolDesc;

    /// Runs the tool. The returned text becomes the content of a `ToolResult` message.
    async fn run(&self, args: Value) -> Result<String>;
}

#[derive(Debug, Clone)]
pub enum ToolInner {
    Function(FunctionTool),
    Knowledge(KnowledgeTool),
}

/// Cloneable handle over any tool the conversation engine can dispatch.
#[derive(Clone)]
pub struct Tool {
    inner: ToolInner,
    validator: Option<Arc<jsonschema::Validator>>,
}

impl Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("inner", &self.inner).finish()
    }
}

impl Tool {
    fn from_inner(inner: ToolInner) -> Self {
        let desc = match &inner {
            ToolInner::Function(tool) => tool.get_description(),
            ToolInner::Knowledge(tool) => tool.get_description(),
        };
        let validator = match jsonschema::validator_for(&desc.parameters) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                log::warn(format!(
                    "tool {} declares an invalid parameter schema, arguments will not be validated: {}",
                    desc.name, e
                ));
                None
            }
        };
        Self { inner, validator }
    }

    pub fn new_function(desc: ToolDesc, f: Arc<ToolFunc>) -> Self {
        Self::from_inner(ToolInner::Function(FunctionTool::new(desc, f)))
    }

    pub fn new_knowledge(tool: KnowledgeTool) -> Self {
        Self::from_inner(ToolInner::Knowledge(tool))
    }

    pub fn name(&self) -> String {
        self.get_description().name
    }

    /// Checks `args` against the declared parameter schema and lists every violation.
    pub fn validate_args(&self, args: &Value) -> Vec<String> {
        match &self.validator {
            Some(validator) => validator.iter_errors(args).map(|e| e.to_string()).collect(),
            None => Vec::new(),
        }
    }
}

#[async_behavior]
impl ToolBehavior for Tool {
    fn get_description(&self) -> ToolDesc {
        match &self.inner {
            ToolInner::Function(tool) => tool.get_description(),
            ToolInner::Knowledge(tool) => tool.get_description(),
        }
    }

    async fn run(&self, args: Value) -> Result<String> {
        match &self.inner {
            ToolInner::Function(tool) => tool.run(args).await,
            ToolInner::Knowledge(tool) => tool.run(args).await,
        }
    }
}
