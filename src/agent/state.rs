use serde::{Deserialize, Serialize};

use crate::value::{Message, ToolCall};

/// Where a turn currently is.
///
/// A turn moves `AwaitingUserInput -> ModelThinking -> (ToolDispatch -> ModelThinking)* ->
/// ResponseReady -> AwaitingUserInput`. `cycle` counts the dispatch cycles completed so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    AwaitingUserInput,
    ModelThinking { cycle: usize },
    ToolDispatch { cycle: usize, calls: Vec<ToolCall> },
    ResponseReady,
}

/// One step reported by [`ConversationEngine::run_turn`](super::ConversationEngine::run_turn).
#[derive(Clone, Debug, PartialEq)]
pub enum TurnEvent {
    State(TurnState),
    ToolCall(ToolCall),
    ToolResult(Message),
    Answer(Message),
}

impl TurnEvent {
    pub fn as_answer(&self) -> Option<&Message> {
        match self {
            Self::Answer(message) => Some(message),
            _ => None,
        }
    }
}
