mod chat;

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    ingest::DocumentIngestor,
    knowledge::KnowledgeTool,
    model::{EmbeddingModel, LangModel, OllamaClient},
    session::{FileSessionStore, InMemorySessionStore, SessionStore},
    vector_store::{ActiveIndex, VectorIndex, open_or_build_with_progress, rebuild_with_progress},
};

#[derive(Parser, Debug)]
#[command(
    name = "ragdesk",
    version,
    about = "Technical support assistant over a local knowledge base",
    long_about = "Backend URLs, model names and paths are read from RAGDESK_* environment variables (a .env file is loaded when present)."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the assistant (default)
    Chat {
        #[arg(long, help = "Session id to resume. Defaults to RAGDESK_SESSION_ID.")]
        session: Option<String>,
    },
    /// Re-ingest the corpus and replace the persisted index
    Reindex,
    /// Run one knowledge base search and print what the assistant would see
    Search {
        query: String,

        #[arg(long, help = "Number of passages to return. Defaults to RAGDESK_TOP_K.")]
        top_k: Option<usize>,
    },
}

/// Providers and ingestion settings built from one [`Config`].
pub(crate) struct Services {
    config: Config,
    lm: LangModel,
    ingestor: DocumentIngestor,
}

impl Services {
    fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = OllamaClient::from_config(&config)?;
        let embedding_model = EmbeddingModel::new_ollama(
            client.clone(),
            config.embedding_model.clone(),
            config.embed_max_input_chars,
        )
        .with_timeout(config.request_timeout());
        let lm = LangModel::new_ollama(client, config.chat_model.clone())
            .with_timeout(config.request_timeout());
        let ingestor = DocumentIngestor::from_config(embedding_model, &config)?;
        Ok(Self {
            config,
            lm,
            ingestor,
        })
    }

    fn session_store(&self) -> Arc<dyn SessionStore> {
        match &self.config.session_dir {
            Some(dir) => Arc::new(FileSessionStore::new(dir.clone())),
            None => Arc::new(InMemorySessionStore::new()),
        }
    }

    fn knowledge_tool(&self, index: Arc<ActiveIndex>) -> anyhow::Result<KnowledgeTool> {
        Ok(
            KnowledgeTool::new(index, self.ingestor.embedding_model().clone())
                .with_top_k(self.config.top_k)?,
        )
    }

    async fn open_index(&self) -> anyhow::Result<VectorIndex> {
        let pb = embedding_progress_bar()?;
        let index = open_or_build_with_progress(
            &self.config.index_dir,
            &self.config.data_dir,
            &self.ingestor,
            |comment, current, total| {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
                pb.set_message(comment.to_owned());
            },
        )
        .await;
        pb.finish_and_clear();
        index.with_context(|| {
            format!(
                "cannot open the index at {}",
                self.config.index_dir.display()
            )
        })
    }

    async fn rebuild_index(&self) -> anyhow::Result<VectorIndex> {
        let pb = embedding_progress_bar()?;
        let index = rebuild_with_progress(
            &self.config.index_dir,
            &self.config.data_dir,
            &self.ingestor,
            |comment, current, total| {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
                pb.set_message(comment.to_owned());
            },
        )
        .await;
        pb.finish_and_clear();
        index.with_context(|| format!("cannot rebuild from {}", self.config.data_dir.display()))
    }
}

fn embedding_progress_bar() -> anyhow::Result<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{wide_bar:.cyan/blue}] {pos}/{len} [{elapsed_precise}]")?
        .progress_chars("#>-");
    let pb = ProgressBar::new(0);
    pb.set_style(style);
    Ok(pb)
}

pub async fn ragdesk_cli(args: Vec<String>) -> anyhow::Result<()> {
    let cli = Cli::parse_from(args);
    let config = Config::from_env().context("invalid configuration")?;
    let services = Services::from_config(config)?;

    match cli.command.unwrap_or(Commands::Chat { session: None }) {
        Commands::Chat { session } => {
            let session = session.unwrap_or_else(|| services.config.session_id.clone());
            chat::run(&services, session).await
        }
        Commands::Reindex => {
            let index = services.rebuild_index().await?;
            println!(
                "Indexed {} chunks into {}",
                index.len(),
                services.config.index_dir.display()
            );
            Ok(())
        }
        Commands::Search { query, top_k } => {
            let index = Arc::new(ActiveIndex::new(services.open_index().await?));
            let mut tool = services.knowledge_tool(index)?;
            if let Some(top_k) = top_k {
                tool = tool.with_top_k(top_k)?;
            }
            println!("{}", tool.search(&query).await?);
            Ok(())
        }
    }
}
