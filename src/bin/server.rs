//! Freesail UI agent HTTP server binary.
//!
//! Connects to the Freesail gateway over MCP, then serves the A2A task
//! endpoint that renders UIs through the gateway's tools.
//!
//! # Environment Variables
//!
//! See [`freesail_agent::config`]; `OPENAI_API_KEY` is required and
//! `RUST_LOG` sets the tracing filter (default: "info,freesail_agent=debug").
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... MCP_URL=http://localhost:3000/mcp cargo run --bin server
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use freesail_agent::a2a::{AgentCard, TaskService};
use freesail_agent::agents::ConversationLoop;
use freesail_agent::config::AgentConfig;
use freesail_agent::llms::OpenAICompletion;
use freesail_agent::mcp::MCPServerHTTP;
use freesail_agent::server::{app_router, serve_until, AppState};
use freesail_agent::session::CapabilitySession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,freesail_agent=debug".into()),
        )
        .init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("FATAL: {}", e);
            return Err(e.into());
        }
    };
    tracing::debug!(?config, "loaded configuration");

    // Capability session, connected and kept alive in the background.
    let connector = Arc::new(MCPServerHTTP::new(&config.mcp_url));
    let session = Arc::new(
        CapabilitySession::new(connector)
            .with_prompt_id(&config.prompt_id)
            .with_connect_timeout(config.connect_timeout),
    );
    tracing::info!("Connecting to Gateway MCP at {}...", config.mcp_url);
    let maintenance = session.spawn_maintenance(config.keep_alive_policy());

    let llm = OpenAICompletion::new(
        &config.model,
        Some(config.openai_api_key.clone()),
        config.openai_base_url.clone(),
    )
    .with_temperature(config.temperature)
    .with_timeout(config.openai_timeout)
    .with_retries(2, Duration::from_secs(1));
    let agent = ConversationLoop::new(session.clone(), Arc::new(llm)).with_max_turns(config.max_turns);
    let tasks = TaskService::new(session, agent, AgentCard::ui_agent(config.public_url()));

    let app = app_router(AppState::new(Arc::new(tasks)));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Freesail UI agent starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      liveness probe");
    tracing::info!("  GET  /.well-known/agent-card.json agent card");
    tracing::info!("  POST /a2a/tasks/send              render_ui tasks");

    // The session is released on Ctrl-C even while task runs are in flight.
    serve_until(listener, app, maintenance, shutdown_signal())
        .await
        .context("server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
