//! Request pipeline: text → interpretation → dispatch → envelope.
//!
//! The orchestrator owns no per-request mutable state; one instance is built
//! at startup and shared behind an `Arc` by every transport.

use crate::config::CommandeerConfig;
use crate::error::OrchestrationError;
use crate::interpreter::Interpreter;
use crate::tools::{self, ToolDefinition, ToolRegistry};
use crate::types::{HealthStatus, ResponseEnvelope};
use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

/// Interpreter and registry wired together.
pub struct Orchestrator {
    interpreter: Interpreter,
    registry: ToolRegistry,
    tool_defs: Vec<ToolDefinition>,
}

impl Orchestrator {
    pub fn new(interpreter: Interpreter, registry: ToolRegistry) -> Self {
        let tool_defs = registry.definitions();
        Self {
            interpreter,
            registry,
            tool_defs,
        }
    }

    /// Build the interpreter and registry described by `config`.
    pub fn from_config(config: &CommandeerConfig) -> Result<Self> {
        let registry = tools::build_registry(config)?;
        let interpreter = Interpreter::from_config(config)?;
        Ok(Self::new(interpreter, registry))
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tool_defs
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::ok()
    }

    /// Run one command end to end. Always returns an envelope.
    pub async fn execute(&self, text: &str) -> ResponseEnvelope {
        let request_id = ulid::Ulid::new().to_string();
        let span = info_span!("execute", request_id = %request_id);
        self.run(request_id, text).instrument(span).await
    }

    async fn run(&self, request_id: String, text: &str) -> ResponseEnvelope {
        if text.trim().is_empty() {
            warn!("Rejected empty command");
            return ResponseEnvelope::failed(
                request_id,
                None,
                OrchestrationError::EmptyCommand.to_string(),
            );
        }

        info!("Command: {}", text);

        let interpretation = match self.interpreter.interpret(text, &self.tool_defs).await {
            Ok(interp) => interp,
            Err(e) => {
                warn!("Interpretation failed: {}", e);
                return ResponseEnvelope::failed(request_id, None, e.to_string());
            }
        };
        info!(
            "Interpretation: {} ({})",
            interpretation.tool_id, interpretation.explanation
        );

        let result = self
            .registry
            .dispatch(&interpretation.tool_id, interpretation.parameters.clone())
            .await;

        if result.is_success() {
            info!("Result: {}", result);
        } else {
            warn!("Result: {}", result);
        }

        ResponseEnvelope::completed(request_id, interpretation, result)
    }
}
