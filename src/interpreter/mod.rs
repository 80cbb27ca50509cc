//! Command interpreter: free-form text to exactly one tool call.
//!
//! The decision itself is delegated to a [`DecisionSource`]. A configured
//! primary source (the model) is tried first; when it is unreachable or
//! declines to pick a tool, the heuristic matcher answers instead, so the
//! heuristic path never fails. A primary that answers with a malformed call
//! is an orchestration error.

pub mod heuristic;
pub mod model;
pub mod prompt;

pub use heuristic::HeuristicMatcher;
pub use model::ModelDecisionSource;

use crate::config::{CommandeerConfig, InterpreterKind};
use crate::error::OrchestrationError;
use crate::tools::ToolDefinition;
use crate::types::Interpretation;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a decision source could not produce an interpretation.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision source unavailable: {0}")]
    Unavailable(String),

    #[error("no tool call in response")]
    NoToolCall,

    #[error("{0}")]
    Malformed(String),
}

/// Strategy that turns text into a tool call.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(
        &self,
        text: &str,
        tools: &[ToolDefinition],
    ) -> Result<Interpretation, DecisionError>;
}

/// Primary decision source plus the heuristic fallback.
pub struct Interpreter {
    primary: Option<Box<dyn DecisionSource>>,
    fallback: HeuristicMatcher,
}

impl Interpreter {
    /// Heuristic-only interpreter.
    pub fn heuristic() -> Self {
        Self {
            primary: None,
            fallback: HeuristicMatcher::new(),
        }
    }

    /// Interpreter that consults `primary` before the heuristic.
    pub fn with_primary(primary: Box<dyn DecisionSource>) -> Self {
        Self {
            primary: Some(primary),
            fallback: HeuristicMatcher::new(),
        }
    }

    pub fn from_config(config: &CommandeerConfig) -> Result<Self> {
        if config.model_enabled() {
            info!(
                "Interpreter: model '{}' at {}",
                config.model_name, config.model_api_url
            );
            let source = ModelDecisionSource::from_config(config)?;
            Ok(Self::with_primary(Box::new(source)))
        } else {
            if config.interpreter == InterpreterKind::Model {
                warn!(
                    "Interpreter '{}' requested but no API key is configured; using {}",
                    config.interpreter,
                    InterpreterKind::Heuristic
                );
            }
            info!("Interpreter: {}", InterpreterKind::Heuristic);
            Ok(Self::heuristic())
        }
    }

    /// Name of the source consulted first.
    pub fn source_name(&self) -> &str {
        match &self.primary {
            Some(primary) => primary.name(),
            None => self.fallback.name(),
        }
    }

    /// Produce exactly one well-formed interpretation for `text`.
    pub async fn interpret(
        &self,
        text: &str,
        tools: &[ToolDefinition],
    ) -> Result<Interpretation, OrchestrationError> {
        let interpretation = match &self.primary {
            None => self.fallback.interpret(text),
            Some(primary) => match primary.decide(text, tools).await {
                Ok(interp) => interp,
                Err(DecisionError::Malformed(reason)) => {
                    return Err(OrchestrationError::MalformedInterpretation(reason));
                }
                Err(e) => {
                    warn!("{} decision failed ({}), using heuristic", primary.name(), e);
                    self.fallback.interpret(text)
                }
            },
        };

        ensure_well_formed(&interpretation)?;
        debug!(
            "Interpreted as {}({})",
            interpretation.tool_id,
            serde_json::Value::Object(interpretation.parameters.clone())
        );
        Ok(interpretation)
    }
}

fn ensure_well_formed(interp: &Interpretation) -> Result<(), OrchestrationError> {
    if interp.tool_id.trim().is_empty() {
        return Err(OrchestrationError::MalformedInterpretation(
            "tool id is empty".into(),
        ));
    }
    if interp.explanation.trim().is_empty() {
        return Err(OrchestrationError::MalformedInterpretation(
            "explanation is empty".into(),
        ));
    }
    Ok(())
}
