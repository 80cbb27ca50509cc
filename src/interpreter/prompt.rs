//! System prompt for the model decision source.

use crate::tools::ToolDefinition;

const ROLE: &str = r#"
# Role

You translate a single user instruction into exactly one tool call that runs
on the user's local machine. Pick the one tool that best satisfies the
instruction and fill in its parameters. Do not chain multiple calls and do
not ask follow-up questions.
"#;

const RULES: &str = r#"
# Rules

- Always answer with one tool call.
- Shell commands run from the user's home directory; prefer non-interactive,
  read-only commands unless the user explicitly asks for a change.
- In your text reply, give a one-sentence explanation of the chosen call.
"#;

/// Build the system prompt listing the available tools.
pub fn build_system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(ROLE);
    prompt.push_str(RULES);

    prompt.push_str("\n# Tools\n\n");
    for tool in tools {
        prompt.push_str(&format!("- `{}`: {}\n", tool.name, tool.description));
    }

    prompt
}
