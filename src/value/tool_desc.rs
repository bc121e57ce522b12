use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes a tool the language model may call: its name, what it does, and the
/// JSON Schema of its arguments.
///
/// # Example
/// ```rust
/// use ragdesk::value::ToolDescBuilder;
/// use serde_json::json;
///
/// let desc = ToolDescBuilder::new("search_knowledge_base")
///     .description("Search the support knowledge base")
///     .parameters(json!({
///         "type": "object",
///         "properties": {"query": {"type": "string"}},
///         "required": ["query"]
///     }))
///     .build();
///
/// assert_eq!(desc.name, "search_knowledge_base");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDesc {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema of the arguments object.
    pub parameters: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
}

impl fmt::Display for ToolDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "ToolDesc {}", s)
    }
}

#[derive(Clone, Debug)]
pub struct ToolDescBuilder {
    name: String,
    description: Option<String>,
    parameters: Option<Value>,
    returns: Option<Value>,
}

impl ToolDescBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: None,
            returns: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn returns(mut self, returns: Value) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Missing parameters default to an empty object schema.
    pub fn build(self) -> ToolDesc {
        ToolDesc {
            name: self.name,
            description: self.description,
            parameters: self
                .parameters
                .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
            returns: self.returns,
        }
    }
}
