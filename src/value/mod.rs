pub(crate) mod chunk;
pub(crate) mod embedding;
pub(crate) mod message;
pub(crate) mod tool_call;
pub(crate) mod tool_desc;

pub use chunk::{
    ChunkMetadata, DocumentChunk, META_CHAR_OFFSET, META_CHUNK_INDEX, META_FILE_NAME, META_SOURCE,
};
pub use embedding::Embedding;
pub use message::{Message, Role};
pub use tool_call::ToolCall;
pub use tool_desc::{ToolDesc, ToolDescBuilder};
