use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::value::ToolCall;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

/// One entry of a conversation history.
///
/// Serialized with a `role` tag so persisted sessions stay readable:
/// ```json
/// { "role": "assistant", "content": "", "tool_calls": [ ... ] }
/// { "role": "tool_result", "call_id": "c1", "tool_name": "search_knowledge_base", "content": "..." }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(self, calls: impl IntoIterator<Item = ToolCall>) -> Self {
        match self {
            Self::Assistant {
                content,
                mut tool_calls,
            } => {
                tool_calls.extend(calls);
                Self::Assistant {
                    content,
                    tool_calls,
                }
            }
            other => other,
        }
    }

    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self::ToolResult {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::ToolResult,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::ToolResult { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_with_role_tag() {
        let call = ToolCall::new("c1", "search_knowledge_base")
            .with_argument("query", json!("error 429"));
        let msg = Message::assistant("").with_tool_calls([call.clone()]);
        let j = serde_json::to_value(&msg).unwrap();
        assert_eq!(j["role"], "assistant");
        assert_eq!(j["tool_calls"][0]["tool_name"], "search_knowledge_base");

        let result = Message::tool_result(&call, "found");
        let j = serde_json::to_value(&result).unwrap();
        assert_eq!(
            j,
            json!({"role": "tool_result", "call_id": "c1", "tool_name": "search_knowledge_base", "content": "found"})
        );
        assert_eq!(serde_json::from_value::<Message>(j).unwrap(), result);
    }

    #[test]
    fn assistant_without_calls_omits_the_field() {
        let j = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert!(j.get("tool_calls").is_none());
        let back: Message = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert_eq!(back, Message::assistant(""));
    }

    #[test]
    fn tool_calls_only_attach_to_assistant() {
        let call = ToolCall::new("c1", "t");
        assert!(!Message::user("q").with_tool_calls([call.clone()]).has_tool_calls());
        assert!(Message::assistant("").with_tool_calls([call]).has_tool_calls());
        assert_eq!(Message::user("q").role().to_string(), "user");
    }
}
