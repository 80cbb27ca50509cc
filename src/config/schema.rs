//! Configuration schema for commandeer.toml.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which decision source turns text into a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterKind {
    /// Rule-based trigger phrases only.
    Heuristic,
    /// OpenAI-compatible function calling, falling back to the heuristic.
    Model,
}

impl fmt::Display for InterpreterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::Model => write!(f, "model"),
        }
    }
}

impl Default for InterpreterKind {
    fn default() -> Self {
        Self::Heuristic
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandeerConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Decision source for the interpreter.
    pub interpreter: InterpreterKind,

    /// OpenAI-compatible API base URL.
    pub model_api_url: String,

    /// Bearer token for the model API.
    pub model_api_key: String,

    /// Model used for function calling.
    pub model_name: String,

    /// Request timeout for the model API, in seconds.
    pub model_timeout_secs: u64,

    /// Shell timeout when the caller does not pass one.
    pub shell_default_timeout_secs: u64,

    /// Upper bound on caller-supplied shell timeouts.
    pub shell_max_timeout_secs: u64,

    /// Size of the bounded invocation pool.
    pub max_concurrent_invocations: usize,
}

impl Default for CommandeerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".into(),
            log_level: "info".into(),
            interpreter: InterpreterKind::Heuristic,
            model_api_url: "https://api.openai.com".into(),
            model_api_key: String::new(),
            model_name: "gpt-4o-mini".into(),
            model_timeout_secs: 20,
            shell_default_timeout_secs: 30,
            shell_max_timeout_secs: 300,
            max_concurrent_invocations: 8,
        }
    }
}

impl CommandeerConfig {
    /// Whether the model decision source can actually be used.
    pub fn model_enabled(&self) -> bool {
        self.interpreter == InterpreterKind::Model && !self.model_api_key.trim().is_empty()
    }
}
