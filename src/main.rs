use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

use sequential_thinking::SequentialThinkingService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing to stderr for MCP compatibility
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting sequential thinking server");

    let service = SequentialThinkingService::new().await?;

    // Start the MCP server on stdio transport
    let server = service.serve(stdio()).await?;

    tracing::info!("Sequential thinking server ready for connections");

    // This keeps the server running until the transport closes
    server.waiting().await?;

    tracing::info!("Sequential thinking server shutting down");
    Ok(())
}
