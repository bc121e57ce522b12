mod render;
mod tool;

pub use render::ResultRenderer;
pub use tool::{DEFAULT_TOP_K, KNOWLEDGE_TOOL_NAME, KnowledgeTool};
