use agentic_rag::{api::start_server, config::RagConfig, RagLoop};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RagConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
    }

    info!("🚀 Agentic RAG - API Server");
    info!("📍 Port: {}", config.port);

    let (knowledge_base, model) = config.build_collaborators()?;
    let rag = Arc::new(RagLoop::new(knowledge_base, model, config.loop_config));

    info!("✅ RagLoop initialized");
    info!("📡 Starting API server...");

    start_server(rag, config.port).await?;

    Ok(())
}
