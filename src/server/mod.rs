//! HTTP server for the UI agent.
//!
//! Exposes the A2A task endpoint other agents delegate UI rendering to.
//!
//! # Endpoints
//!
//! - `GET  /health`                      - Liveness probe
//! - `GET  /.well-known/agent-card.json` - Agent card
//! - `POST /a2a/tasks/send`              - Run a `render_ui` task

pub mod routes;
pub mod shutdown;

pub use routes::{app_router, AppState};
pub use shutdown::serve_until;
