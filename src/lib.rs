// src/lib.rs

use std::sync::Arc;

pub mod api;
pub mod blockchain;
pub mod chat;
pub mod config;
pub mod error;
pub mod mcp;
pub mod mint;
pub mod utils;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Routes classified utterances to the tool gateway
    pub router: Arc<chat::router::CommandRouter>,
}

impl AppState {
    /// State backed by the MCP server named in `config`.
    pub fn from_config(config: config::Config) -> Self {
        let gateway = Arc::new(mcp::gateway::McpGateway::new(config.mcp_server_url.clone()));
        let router = Arc::new(chat::router::CommandRouter::new(gateway, config.collection()));
        Self { config, router }
    }
}
