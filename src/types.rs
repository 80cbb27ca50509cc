//! Shared types used across the orchestration pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool parameters as received from a decision source.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Interpretation
// ---------------------------------------------------------------------------

/// The interpreter's decision: one tool, its parameters, and a rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub tool_id: String,
    pub parameters: Parameters,
    pub explanation: String,
}

impl Interpretation {
    pub fn new(
        tool_id: impl Into<String>,
        parameters: Parameters,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            parameters,
            explanation: explanation.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool results
// ---------------------------------------------------------------------------

/// Outcome of a single capability invocation.
///
/// A non-zero exit status is still a `Success`: the process ran to
/// completion. `Failure` means the action could not run or finish at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        stdout: String,
        stderr: String,
        return_code: i32,
        tool_id: String,
    },
    Failure {
        error_message: String,
        tool_id: String,
    },
}

impl ToolResult {
    pub fn success(
        tool_id: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        return_code: i32,
    ) -> Self {
        Self::Success {
            stdout: stdout.into(),
            stderr: stderr.into(),
            return_code,
            tool_id: tool_id.into(),
        }
    }

    pub fn failure(tool_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: error_message.into(),
            tool_id: tool_id.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Identifier of the tool that produced this result.
    pub fn tool_id(&self) -> &str {
        match self {
            Self::Success { tool_id, .. } | Self::Failure { tool_id, .. } => tool_id,
        }
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                return_code,
                tool_id,
                ..
            } => write!(f, "{} exited with code {}", tool_id, return_code),
            Self::Failure {
                error_message,
                tool_id,
            } => write!(f, "{} failed: {}", tool_id, error_message),
        }
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The unit returned to external callers for every `execute` request.
///
/// `success` is false only when the pipeline itself failed; in that case
/// `error` is set and `interpretation`/`result` may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub request_id: String,
    pub success: bool,
    pub interpretation: Option<Interpretation>,
    pub result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseEnvelope {
    /// Envelope for a pipeline that ran to completion (whatever the tool outcome).
    pub fn completed(
        request_id: String,
        interpretation: Interpretation,
        result: ToolResult,
    ) -> Self {
        Self {
            request_id,
            success: true,
            interpretation: Some(interpretation),
            result: Some(result),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Envelope for a pipeline failure outside the dispatch boundary.
    pub fn failed(
        request_id: String,
        interpretation: Option<Interpretation>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            success: false,
            interpretation,
            result: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness probe payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_with_status_tag() {
        let result = ToolResult::success("shell", "hi\n", "", 0);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "stdout": "hi\n",
                "stderr": "",
                "return_code": 0,
                "tool_id": "shell"
            })
        );
    }

    #[test]
    fn failure_keeps_tool_id() {
        let result = ToolResult::failure("shell", "timeout");
        assert!(!result.is_success());
        assert_eq!(result.tool_id(), "shell");
        assert_eq!(result.to_string(), "shell failed: timeout");

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["error_message"], "timeout");
    }

    #[test]
    fn failed_envelope_omits_result_and_sets_error() {
        let env = ResponseEnvelope::failed("01TEST".into(), None, "malformed interpretation");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["result"].is_null());
        assert_eq!(value["error"], "malformed interpretation");
    }

    #[test]
    fn completed_envelope_has_no_error_field() {
        let interp = Interpretation::new("shell", Parameters::new(), "literal");
        let env = ResponseEnvelope::completed(
            "01TEST".into(),
            interp,
            ToolResult::failure("shell", "timeout"),
        );
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
        assert_eq!(value["result"]["status"], "failure");
    }
}
