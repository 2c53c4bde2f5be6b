use anyhow::Result;
use clap::Parser;
use ragrelay::server::{self, AppState, DEFAULT_FASTAPI_URL};
use ragrelay_local::fetch::RetryPolicy;
use ragrelay_local::session::MemorySessionStore;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ragrelay")]
#[command(about = "HTTP relay for arXiv summarization and RAG chat sessions", long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,
    /// Base URL of the external RAG backend.
    #[arg(long, env = "FASTAPI_URL", default_value = DEFAULT_FASTAPI_URL)]
    fastapi_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let state = Arc::new(AppState {
        http: ragrelay_local::default_client()?,
        fastapi_url: cli.fastapi_url,
        retry: RetryPolicy::default(),
        sessions: Arc::new(MemorySessionStore::new()),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, fastapi_url = %state.fastapi_url, "ragrelay listening");
    axum::serve(listener, server::router(state)).await?;
    Ok(())
}
