//! CareerSim · Career Simulation Backend
//!
//! - Session state controller per client (view state machine, history, saved resources)
//! - Schema-constrained scenario/feedback generation via an OpenAI-compatible API
//! - Axum HTTP + WebSocket API, static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables generation; without it every generation call fails
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL   : scenario model, default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL : feedback model, default "gpt-4o"
//!   AGENT_CONFIG_PATH   : path to TOML config (prompts + optional role catalog)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod catalog;
mod schema;
mod openai;
mod generation;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::new()?);
  state::spawn_session_sweeper(state.clone());
  let app = build_router(state.clone());

  let addr = listen_addr(std::env::var("PORT").ok().as_deref());
  let listener = TcpListener::bind(addr).await?;
  info!(target: "careersim_backend", %addr, generation = state.generator.backend_name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "careersim_backend", "Server stopped");
  Ok(())
}

/// All interfaces on `PORT`; an unset or unparsable value means 3000.
fn listen_addr(port: Option<&str>) -> SocketAddr {
  let port = port.and_then(|p| p.trim().parse::<u16>().ok()).unwrap_or(3000);
  SocketAddr::from(([0, 0, 0, 0], port))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "careersim_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "careersim_backend", "Shutdown signal received");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn port_defaults_when_missing_or_garbage() {
    assert_eq!(listen_addr(None).port(), 3000);
    assert_eq!(listen_addr(Some("http")).port(), 3000);
    assert_eq!(listen_addr(Some(" 8080 ")).port(), 8080);
  }
}
