mod engine;
mod state;

pub use engine::{AgentConfig, ConversationEngine};
pub use state::{TurnEvent, TurnState};
