use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autocote_cli::run(autocote_cli::Cli::parse()).await
}
