//! Tool registry and dispatcher.
//!
//! The registry is filled once at startup and then shared read-only behind
//! an `Arc`. `dispatch` is the error boundary of the pipeline: lookup
//! misses, invalid parameters, capability errors and capability panics all
//! come back as `ToolResult::Failure`, never as `Err`.

use super::schema;
use super::traits::{Tool, ToolDefinition};
use crate::error::{DispatchError, DuplicateToolError};
use crate::types::{Parameters, ToolResult};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Holds registered tools and routes calls to them.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable tool listings.
    order: Vec<String>,
    /// Bounded pool of concurrent invocations.
    permits: Arc<Semaphore>,
}

impl ToolRegistry {
    /// Create an empty registry allowing `max_concurrent` in-flight invocations.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Register a tool under its own name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), DuplicateToolError> {
        let id = tool.name().to_string();
        if self.contains(&id) {
            return Err(DuplicateToolError(id));
        }
        debug!("Registered tool '{}'", id);
        self.order.push(id.clone());
        self.tools.insert(id, tool);
        Ok(())
    }

    /// Whether a tool is registered under `tool_id`.
    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function-calling definitions for every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|id| self.tools.get(id))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Validate and invoke `tool_id` exactly once.
    pub async fn dispatch(&self, tool_id: &str, params: Parameters) -> ToolResult {
        match self.try_dispatch(tool_id, params).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Dispatch of '{}' failed: {}", e.tool_id(), e);
                e.into_result()
            }
        }
    }

    async fn try_dispatch(
        &self,
        tool_id: &str,
        params: Parameters,
    ) -> Result<ToolResult, DispatchError> {
        let tool = self
            .tools
            .get(tool_id)
            .cloned()
            .ok_or_else(|| DispatchError::ToolNotFound {
                tool_id: tool_id.to_string(),
            })?;

        schema::validate(&tool.input_schema(), &params).map_err(|reason| {
            DispatchError::InvalidParameters {
                tool_id: tool_id.to_string(),
                reason,
            }
        })?;

        let permit = self.permits.clone().acquire_owned().await.map_err(|_| {
            DispatchError::CapabilityRuntime {
                tool_id: tool_id.to_string(),
                message: "invocation pool is closed".into(),
            }
        })?;

        // The permit moves into the task so an abandoned request still
        // counts against the pool until its invocation finishes.
        let handle = tokio::spawn(async move {
            let _permit = permit;
            tool.invoke(params).await
        });

        match handle.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(DispatchError::CapabilityRuntime {
                tool_id: tool_id.to_string(),
                message: format!("{:#}", e),
            }),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    format!("tool panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    join_err.to_string()
                };
                Err(DispatchError::CapabilityRuntime {
                    tool_id: tool_id.to_string(),
                    message,
                })
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{ParamSpec, ParamType};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Pure tool: echoes `text` back on stdout and counts invocations.
    #[derive(Default)]
    struct EchoTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text back."
        }

        fn input_schema(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::required("text", ParamType::String, "Text to echo"),
                ParamSpec::optional("delay_ms", ParamType::Integer, "Delay before replying"),
            ]
        }

        async fn invoke(&self, params: Parameters) -> Result<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = params.get("delay_ms").and_then(|v| v.as_u64()) {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            let text = params["text"].as_str().unwrap_or_default();
            Ok(ToolResult::success(self.name(), format!("{}\n", text), "", 0))
        }
    }

    struct BrokenTool {
        panic: bool,
    }

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails unexpectedly."
        }

        fn input_schema(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn invoke(&self, _params: Parameters) -> Result<ToolResult> {
            if self.panic {
                panic!("boom");
            }
            bail!("disk on fire")
        }
    }

    /// Tracks the peak number of overlapping invocations.
    #[derive(Default)]
    struct GaugeTool {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Tool for GaugeTool {
        fn name(&self) -> &str {
            "gauge"
        }

        fn description(&self) -> &str {
            "Measures concurrency."
        }

        fn input_schema(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        async fn invoke(&self, _params: Parameters) -> Result<ToolResult> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ToolResult::success(self.name(), "", "", 0))
        }
    }

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    fn registry_with_echo() -> (ToolRegistry, Arc<EchoTool>) {
        let echo = Arc::new(EchoTool::default());
        let mut registry = ToolRegistry::new(4);
        registry.register(echo.clone()).unwrap();
        (registry, echo)
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (mut registry, _) = registry_with_echo();
        let err = registry.register(Arc::new(EchoTool::default())).unwrap_err();
        assert_eq!(err, DuplicateToolError("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn contains_reports_registered_tools_only() {
        let (registry, _) = registry_with_echo();
        assert!(registry.contains("echo"));
        assert!(!registry.contains("Echo"));
        assert!(!registry.contains("shell"));
    }

    #[test]
    fn definitions_follow_registration_order() {
        let (mut registry, _) = registry_with_echo();
        registry
            .register(Arc::new(BrokenTool { panic: false }))
            .unwrap();
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "broken"]);
    }

    #[tokio::test]
    async fn valid_dispatch_invokes_exactly_once() {
        let (registry, echo) = registry_with_echo();
        let result = registry.dispatch("echo", params(json!({"text": "hi"}))).await;
        assert_eq!(result, ToolResult::success("echo", "hi\n", "", 0));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_fails_closed() {
        let (registry, echo) = registry_with_echo();
        let result = registry.dispatch("nonexistent", Parameters::new()).await;
        assert_eq!(result, ToolResult::failure("nonexistent", "tool not found"));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_parameters_never_reach_the_tool() {
        let (registry, echo) = registry_with_echo();

        for bad in [
            json!({"text": "hi", "extra": true}),
            json!({}),
            json!({"text": 42}),
        ] {
            match registry.dispatch("echo", params(bad)).await {
                ToolResult::Failure {
                    error_message,
                    tool_id,
                } => {
                    assert_eq!(tool_id, "echo");
                    assert!(error_message.starts_with("invalid parameters:"));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn runtime_error_becomes_failure() {
        let mut registry = ToolRegistry::new(1);
        registry
            .register(Arc::new(BrokenTool { panic: false }))
            .unwrap();
        let result = registry.dispatch("broken", Parameters::new()).await;
        assert_eq!(result, ToolResult::failure("broken", "disk on fire"));
    }

    #[tokio::test]
    async fn panic_becomes_failure() {
        let mut registry = ToolRegistry::new(1);
        registry
            .register(Arc::new(BrokenTool { panic: true }))
            .unwrap();
        match registry.dispatch("broken", Parameters::new()).await {
            ToolResult::Failure { error_message, .. } => {
                assert_eq!(error_message, "tool panicked: boom");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn repeated_dispatch_of_pure_tool_is_identical() {
        let (registry, echo) = registry_with_echo();
        let first = registry.dispatch("echo", params(json!({"text": "same"}))).await;
        let second = registry.dispatch("echo", params(json!({"text": "same"}))).await;
        assert_eq!(first, second);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatch_pairs_results_with_requests() {
        let (registry, echo) = registry_with_echo();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let text = format!("request-{}", i);
                    // Reverse delays so completion order differs from submission order.
                    let delay = (16 - i) * 5;
                    let result = registry
                        .dispatch("echo", params(json!({"text": text, "delay_ms": delay})))
                        .await;
                    (text, result)
                })
            })
            .collect();

        for handle in handles {
            let (text, result) = handle.await.unwrap();
            assert_eq!(result, ToolResult::success("echo", format!("{}\n", text), "", 0));
        }
        assert_eq!(echo.calls.load(Ordering::SeqCst), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn invocations_are_bounded_by_pool_size() {
        let gauge = Arc::new(GaugeTool::default());
        let mut registry = ToolRegistry::new(2);
        registry.register(gauge.clone()).unwrap();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.dispatch("gauge", Parameters::new()).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }
}
