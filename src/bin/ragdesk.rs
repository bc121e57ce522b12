#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("ragdesk=info"))
        .init();
    let args: Vec<String> = std::env::args().collect();
    ragdesk::cli::ragdesk_cli(args).await
}
