//! Rule-based decision source.
//!
//! Lower-cased substring tests against an ordered trigger list; the first
//! rule that matches wins. Anything unmatched is passed to the shell tool
//! verbatim.

use super::{DecisionError, DecisionSource};
use crate::tools::{ToolDefinition, SHELL_TOOL_ID};
use crate::types::{Interpretation, Parameters};
use async_trait::async_trait;
use serde_json::Value;

/// One trigger rule: any of `phrases` maps to `command`.
struct Rule {
    phrases: &'static [&'static str],
    command: &'static str,
    summary: &'static str,
}

/// Ordered rule table. Earlier rules shadow later ones.
const RULES: &[Rule] = &[
    Rule {
        phrases: &["list files"],
        command: "ls -la",
        summary: "list files in the home directory",
    },
    Rule {
        phrases: &["disk usage", "disk space"],
        command: "df -h",
        summary: "show disk usage",
    },
    Rule {
        phrases: &["memory usage"],
        command: "free -h",
        summary: "show memory usage",
    },
    Rule {
        phrases: &["running processes"],
        command: "ps aux",
        summary: "list running processes",
    },
    Rule {
        phrases: &["current directory", "where am i"],
        command: "pwd",
        summary: "print the working directory",
    },
    Rule {
        phrases: &["who am i"],
        command: "whoami",
        summary: "print the current user",
    },
    Rule {
        phrases: &["system info"],
        command: "uname -a",
        summary: "show system information",
    },
    Rule {
        phrases: &["what time", "current date"],
        command: "date",
        summary: "show the current date and time",
    },
];

/// Heuristic stand-in for a model decision source. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMatcher;

impl HeuristicMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Map `text` to exactly one shell interpretation.
    pub fn interpret(&self, text: &str) -> Interpretation {
        let lowered = text.to_lowercase();

        let matched = RULES.iter().find_map(|rule| {
            rule.phrases
                .iter()
                .find(|phrase| lowered.contains(*phrase))
                .map(|phrase| (rule, *phrase))
        });

        match matched {
            Some((rule, phrase)) => shell_call(
                rule.command,
                format!(
                    "Matched \"{}\": running `{}` to {}.",
                    phrase, rule.command, rule.summary
                ),
            ),
            None => shell_call(
                text.trim(),
                "No known intent matched; treating the input as a literal shell command.",
            ),
        }
    }
}

#[async_trait]
impl DecisionSource for HeuristicMatcher {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn decide(
        &self,
        text: &str,
        _tools: &[ToolDefinition],
    ) -> Result<Interpretation, DecisionError> {
        Ok(self.interpret(text))
    }
}

fn shell_call(command: &str, explanation: impl Into<String>) -> Interpretation {
    let mut parameters = Parameters::new();
    parameters.insert("command".into(), Value::String(command.to_string()));
    Interpretation::new(SHELL_TOOL_ID, parameters, explanation)
}
