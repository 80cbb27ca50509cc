//! Model-backed decision source.
//!
//! Sends the instruction to an OpenAI-compatible chat completions endpoint
//! with the registry's tools attached, and turns the first tool call into an
//! interpretation.

use super::prompt;
use super::{DecisionError, DecisionSource};
use crate::config::CommandeerConfig;
use crate::tools::ToolDefinition;
use crate::types::{Interpretation, Parameters};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Function-calling client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct ModelDecisionSource {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    tools: Vec<ToolPayload<'a>>,
    tool_choice: &'a str,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    /// Absent or `null` when the model answered with text only.
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}

impl ModelDecisionSource {
    /// Create a new model decision source.
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build model HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
        })
    }

    pub fn from_config(config: &CommandeerConfig) -> Result<Self> {
        Self::new(
            &config.model_api_url,
            &config.model_api_key,
            &config.model_name,
            Duration::from_secs(config.model_timeout_secs),
        )
    }
}

#[async_trait]
impl DecisionSource for ModelDecisionSource {
    fn name(&self) -> &str {
        "model"
    }

    async fn decide(
        &self,
        text: &str,
        tools: &[ToolDefinition],
    ) -> Result<Interpretation, DecisionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let system_prompt = prompt::build_system_prompt(tools);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                MessagePayload {
                    role: "system",
                    content: &system_prompt,
                },
                MessagePayload {
                    role: "user",
                    content: text,
                },
            ],
            tools: tools
                .iter()
                .map(|t| ToolPayload {
                    r#type: "function",
                    function: FunctionPayload {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            tool_choice: "auto",
            temperature: 0.0,
        };

        debug!("Model request to {} ({})", url, self.model);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DecisionError::Unavailable(format!("model request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DecisionError::Unavailable(format!(
                "model request failed ({}): {}",
                status, body
            )));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            DecisionError::Malformed(format!("unparseable model response: {}", e))
        })?;

        interpretation_from_response(body)
    }
}

/// Turn the first tool call of a completion into an interpretation.
fn interpretation_from_response(body: ChatResponse) -> Result<Interpretation, DecisionError> {
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or(DecisionError::NoToolCall)?;

    let call = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(DecisionError::NoToolCall)?;

    let name = call.function.name.trim().to_string();
    if name.is_empty() {
        return Err(DecisionError::Malformed("tool call has no name".into()));
    }

    // Some models send "" for a call without arguments.
    let raw_args = call.function.arguments.trim();
    let args: serde_json::Value = if raw_args.is_empty() {
        serde_json::Value::Object(Parameters::new())
    } else {
        serde_json::from_str(raw_args).map_err(|e| {
            DecisionError::Malformed(format!("arguments for '{}' are not valid JSON: {}", name, e))
        })?
    };
    let parameters = match args {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(DecisionError::Malformed(format!(
                "arguments for '{}' must be a JSON object, got {}",
                name, other
            )))
        }
    };

    let explanation = message
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| format!("The model selected the '{}' tool for this instruction.", name));

    Ok(Interpretation::new(name, parameters, explanation))
}
