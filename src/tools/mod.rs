pub mod registry;
pub mod schema;
pub mod shell;
pub mod traits;

pub use registry::ToolRegistry;
pub use schema::{ParamSpec, ParamType};
pub use shell::{ShellTool, SHELL_TOOL_ID};
pub use traits::{Tool, ToolDefinition};

use crate::config::CommandeerConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the process-wide registry with every built-in tool.
///
/// Called once at startup; the result is shared read-only afterwards.
pub fn build_registry(config: &CommandeerConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new(config.max_concurrent_invocations);

    let shell = ShellTool::new(
        config.shell_default_timeout_secs,
        config.shell_max_timeout_secs,
    )?;
    warn!(
        "Shell tool executes unrestricted commands as the current user (cwd: {})",
        shell.working_dir().display()
    );
    registry
        .register(Arc::new(shell))
        .context("Failed to register shell tool")?;

    info!(
        "Tool registry ready: {} tool(s), {} concurrent invocation(s)",
        registry.len(),
        config.max_concurrent_invocations
    );
    Ok(registry)
}
