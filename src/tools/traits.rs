//! Tool trait definition.

use super::schema::{self, ParamSpec};
use crate::types::{Parameters, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Definition of a tool exposed to a decision source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A registered, stateless capability.
///
/// `invoke` reports declared failures (timeouts, spawn errors) as
/// `Ok(ToolResult::Failure { .. })`. An `Err` is an unexpected runtime error
/// and is folded into a failure result by the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool id (used in function calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Ordered input contract.
    fn input_schema(&self) -> Vec<ParamSpec>;

    /// Execute the tool with already-validated parameters.
    async fn invoke(&self, params: Parameters) -> Result<ToolResult>;

    /// Function-calling definition derived from the input contract.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: schema::to_json_schema(&self.input_schema()),
        }
    }
}
