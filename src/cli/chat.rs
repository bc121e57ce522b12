use std::{io::Write as _, sync::Arc};

use futures::StreamExt as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};

use super::Services;
use crate::{
    agent::{AgentConfig, ConversationEngine, TurnEvent, TurnState},
    tool::Tool,
    vector_store::ActiveIndex,
};

const EXIT_TOKENS: [&str; 3] = ["q", "exit", "quit"];

const REINDEX_COMMAND: &str = "/reindex";

fn is_exit(input: &str) -> bool {
    EXIT_TOKENS
        .iter()
        .any(|token| input.trim().eq_ignore_ascii_case(token))
}

/// Progress printed while a turn runs.
fn marker(event: &TurnEvent) -> Option<&'static str> {
    match event {
        TurnEvent::State(TurnState::ModelThinking { .. }) => Some("."),
        TurnEvent::State(TurnState::ToolDispatch { .. }) => Some(" [searching knowledge base] "),
        _ => None,
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}

pub(super) async fn run(services: &Services, session_id: String) -> anyhow::Result<()> {
    let index = Arc::new(ActiveIndex::new(services.open_index().await?));
    let knowledge = services.knowledge_tool(index.clone())?;
    let engine = ConversationEngine::new(
        services.lm.clone(),
        [Tool::new_knowledge(knowledge)],
        services.session_store(),
    )
    .with_config(AgentConfig::from_config(&services.config));

    println!(
        "Assistant is ready! {} chunks indexed, session \"{}\". (type 'q' to quit)",
        index.current().len(),
        session_id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        flush();
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            println!("Goodbye!");
            break;
        }
        if input == REINDEX_COMMAND {
            match services.rebuild_index().await {
                Ok(next) => {
                    let chunks = next.len();
                    index.swap(next);
                    println!("Reindexed: {} chunks", chunks);
                }
                Err(e) => println!("Error: {:#}", e),
            }
            continue;
        }

        print!("Thinking");
        flush();
        let mut strm = engine.run_turn(session_id.clone(), input);
        while let Some(event) = strm.next().await {
            match event {
                Ok(TurnEvent::Answer(message)) => {
                    println!("\n\nAssistant:\n{}", message.text());
                }
                Ok(event) => {
                    if let Some(marker) = marker(&event) {
                        print!("{}", marker);
                        flush();
                    }
                }
                Err(e) => println!("\nError: {}", e),
            }
        }
    }
    Ok(())
}
