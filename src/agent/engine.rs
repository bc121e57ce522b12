use std::sync::Arc;

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};

use super::state::{TurnEvent, TurnState};
use crate::{
    config::{Config, DEFAULT_SYSTEM_MESSAGE},
    error::{Error, Result},
    model::{InferenceConfig, LangModel, LangModelInference as _},
    session::SessionStore,
    tool::{Tool, ToolBehavior as _},
    utils::{BoxStream, Ellipsis as _, KeyedLocks, log},
    value::{Message, Role, ToolCall, ToolDesc},
};

/// Configuration for running conversation turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Seeded as the first message of every new session. `None` seeds nothing.
    pub system_message: Option<String>,
    /// Dispatch cycles allowed per turn before the turn fails with `ToolLoopExceeded`.
    pub max_tool_cycles: usize,
    pub inference: InferenceConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_message: Some(DEFAULT_SYSTEM_MESSAGE.into()),
            max_tool_cycles: 10,
            inference: InferenceConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_message: (!config.system_message.trim().is_empty())
                .then(|| config.system_message.clone()),
            max_tool_cycles: config.max_tool_cycles,
            inference: InferenceConfig {
                temperature: Some(config.temperature),
                max_tokens: None,
            },
        }
    }
}

/// Drives conversation turns: calls the language model, dispatches the tools it asks for and
/// checkpoints every completed step to the session store.
///
/// # Public APIs
/// - `run_turn`: runs one user message and streams every state transition, tool call and
///   tool result, ending with the answer
/// - `ask`: runs one user message and returns only the answer
/// - `history`: the stored messages of a session
///
/// A failed turn is reported as one `Err` item. The session stays usable: the user message is
/// kept, and nothing from the failed cycle is stored.
#[derive(Clone)]
pub struct ConversationEngine {
    lm: LangModel,
    tools: Vec<Tool>,
    store: Arc<dyn SessionStore>,
    config: AgentConfig,
    turn_locks: Arc<KeyedLocks>,
}

impl ConversationEngine {
    pub fn new(
        lm: LangModel,
        tools: impl IntoIterator<Item = Tool>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let mut engine = Self {
            lm,
            tools: Vec::new(),
            store,
            config: AgentConfig::default(),
            turn_locks: Default::default(),
        };
        engine.add_tools(tools);
        engine
    }

    pub fn with_config(self, config: AgentConfig) -> Self {
        Self { config, ..self }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn add_tools(&mut self, tools: impl IntoIterator<Item = Tool>) {
        for tool in tools {
            let tool_name = tool.name();
            if self.tools.iter().any(|t| t.name() == tool_name) {
                log::warn(format!(
                    "Tool \"{}\" is already registered. Skip adding the tool.",
                    tool_name
                ));
                continue;
            }
            self.tools.push(tool);
        }
    }

    pub fn add_tool(&mut self, tool: Tool) {
        self.add_tools([tool]);
    }

    pub fn tool_descs(&self) -> Vec<ToolDesc> {
        self.tools.iter().map(|t| t.get_description()).collect()
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .store
            .get(session_id)
            .await?
            .map(|s| s.messages)
            .unwrap_or_default())
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<Message> {
        let args = call.arguments_value();
        log::debug(format!(
            "dispatching {} {}",
            call.tool_name,
            args.to_string().ellipsis(120)
        ));

        let Some(tool) = self.tools.iter().find(|t| t.name() == call.tool_name) else {
            let err = Error::UnknownTool {
                name: call.tool_name.clone(),
            };
            log::warn(&err);
            return Ok(Message::tool_result(call, format!("Error: {}", err)));
        };

        let violations = tool.validate_args(&args);
        if !violations.is_empty() {
            return Ok(Message::tool_result(
                call,
                format!(
                    "Error: invalid arguments for {}: {}",
                    call.tool_name,
                    violations.join("; ")
                ),
            ));
        }

        let content = tool.run(args).await?;
        Ok(Message::tool_result(call, content))
    }

    /// Runs one turn of `session_id` with the user's `input`.
    ///
    /// Turns on the same session run one after another; turns on different sessions run in
    /// parallel.
    pub fn run_turn(
        &self,
        session_id: impl Into<String>,
        input: impl Into<String>,
    ) -> BoxStream<'static, Result<TurnEvent>> {
        let engine = self.clone();
        let session_id = session_id.into();
        let input = input.into();
        let failed_session = session_id.clone();

        let strm = async_stream::try_stream! {
            let _turn = engine.turn_locks.lock(&session_id).await;

            let mut messages = engine.history(&session_id).await?;
            let mut opening = Vec::new();
            if messages.is_empty()
                && let Some(system_message) = &engine.config.system_message
            {
                opening.push(Message::system(system_message.clone()));
            }
            opening.push(Message::user(input));
            engine.store.append(&session_id, opening.clone()).await?;
            messages.extend(opening);

            let tool_descs = engine.tool_descs();
            let mut cycle = 0;
            loop {
                yield TurnEvent::State(TurnState::ModelThinking { cycle });
                let response = engine
                    .lm
                    .infer(messages.clone(), tool_descs.clone(), engine.config.inference.clone())
                    .await?;
                if response.role() != Role::Assistant {
                    Err::<(), Error>(Error::Completion(format!(
                        "expected an assistant message, got {}",
                        response.role()
                    )))?;
                }

                if !response.has_tool_calls() {
                    engine.store.append(&session_id, vec![response.clone()]).await?;
                    yield TurnEvent::State(TurnState::ResponseReady);
                    yield TurnEvent::Answer(response);
                    yield TurnEvent::State(TurnState::AwaitingUserInput);
                    break;
                }
                if cycle >= engine.config.max_tool_cycles {
                    Err::<(), Error>(Error::ToolLoopExceeded {
                        max_cycles: engine.config.max_tool_cycles,
                    })?;
                }

                let calls = response.tool_calls().to_vec();
                yield TurnEvent::State(TurnState::ToolDispatch { cycle, calls: calls.clone() });
                let mut completed = vec![response];
                for call in calls {
                    yield TurnEvent::ToolCall(call.clone());
                    let result = engine.dispatch(&call).await?;
                    yield TurnEvent::ToolResult(result.clone());
                    completed.push(result);
                }
                engine.store.append(&session_id, completed.clone()).await?;
                messages.extend(completed);
                cycle += 1;
            }
        };

        Box::pin(strm.inspect(move |item| {
            if let Err(e) = item {
                log::error(format!("turn failed in session {}: {}", failed_session, e));
            }
        }))
    }

    /// Runs one turn and returns the answer.
    pub async fn ask(
        &self,
        session_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Result<Message> {
        let mut strm = self.run_turn(session_id, input);
        let mut answer = None;
        while let Some(event) = strm.next().await {
            if let Some(message) = event?.as_answer() {
                answer = Some(message.clone());
            }
        }
        answer.ok_or_else(|| Error::Completion("turn ended without an answer".into()))
    }
}
