use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use ragdesk_macros::{async_behavior, thread_safe};
use serde_json::Value;

use crate::{error::Result, tool::ToolBehavior, utils::BoxFuture, value::ToolDesc};

#[thread_safe]
pub type ToolFunc = dyn Fn(Value) -> BoxFuture<'static, Result<String>>;

/// A tool backed by an async closure.
#[derive(Clone)]
pub struct FunctionTool {
    desc: ToolDesc,
    f: Arc<ToolFunc>,
}

impl Debug for FunctionTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("f", &"(Function)")
            .field("desc", &self.desc)
            .finish()
    }
}

impl FunctionTool {
    pub fn new(desc: ToolDesc, f: Arc<ToolFunc>) -> Self {
        FunctionTool { desc, f }
    }
}

#[async_behavior]
impl ToolBehavior for FunctionTool {
    fn get_description(&self) -> ToolDesc {
        self.desc.clone()
    }

    async fn run(&self, args: Value) -> Result<String> {
        (self.f)(args).await
    }
}
