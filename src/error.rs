//! Error taxonomy for registration, dispatch, and orchestration.
//!
//! Dispatch errors never cross the registry boundary as `Err`: they are
//! rendered into [`ToolResult::Failure`] via [`DispatchError::into_result`].

use crate::types::ToolResult;
use thiserror::Error;

/// Returned by `ToolRegistry::register` when a tool id is taken.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("tool '{0}' is already registered")]
pub struct DuplicateToolError(pub String);

/// Failures at or below the dispatch boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("tool not found")]
    ToolNotFound { tool_id: String },

    #[error("invalid parameters: {reason}")]
    InvalidParameters { tool_id: String, reason: String },

    #[error("timeout: command did not finish within {secs}s")]
    CapabilityTimeout { tool_id: String, secs: u64 },

    #[error("{message}")]
    CapabilityRuntime { tool_id: String, message: String },
}

impl DispatchError {
    pub fn tool_id(&self) -> &str {
        match self {
            Self::ToolNotFound { tool_id }
            | Self::InvalidParameters { tool_id, .. }
            | Self::CapabilityTimeout { tool_id, .. }
            | Self::CapabilityRuntime { tool_id, .. } => tool_id,
        }
    }

    /// Convert into the uniform failure result.
    pub fn into_result(self) -> ToolResult {
        let message = self.to_string();
        let tool_id = match self {
            Self::ToolNotFound { tool_id }
            | Self::InvalidParameters { tool_id, .. }
            | Self::CapabilityTimeout { tool_id, .. }
            | Self::CapabilityRuntime { tool_id, .. } => tool_id,
        };
        ToolResult::failure(tool_id, message)
    }
}

/// Failures in the orchestration plumbing, reported as `success=false`.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("command must not be empty")]
    EmptyCommand,

    #[error("malformed interpretation: {0}")]
    MalformedInterpretation(String),
}
