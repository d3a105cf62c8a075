use calmly::cli::{self, Args};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = cli::run(args).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
