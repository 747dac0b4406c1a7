//! Immutable configuration values, built once at startup.
//!
//! [`RelayConfig`] is handed to [`ConversionRelay`](crate::relay::ConversionRelay)
//! and [`ServerConfig`] to [`server::router`](crate::server::router). Neither
//! reads the environment; `main.rs` resolves CLI flags and env vars into them.

use std::path::PathBuf;

use crate::consts::{DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use crate::prompts::convert::build_convert_system_instruction;

/// Everything the relay needs to shape one conversion.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    api_key: Option<String>,
    system_instruction: String,
}

impl RelayConfig {
    /// Build a config with the default system instruction.
    /// An empty or whitespace-only key is treated as missing.
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            api_key,
            system_instruction: build_convert_system_instruction(),
        }
    }

    /// Replace the system instruction (tests, experiments).
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }
}

/// HTTP host settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served as a fallback for non-API paths. `None` disables it.
    pub public_dir: Option<PathBuf>,
    pub max_body_bytes: usize,
    /// Allowed CORS origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_dir: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
