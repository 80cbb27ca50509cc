//! Declared input contracts for tools and validation of incoming parameters.

use crate::types::Parameters;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A single named parameter in a tool's input contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Check `params` against an ordered input contract.
///
/// Rejects unknown keys, missing required keys, and type mismatches. The
/// returned message names the offending parameter.
pub fn validate(schema: &[ParamSpec], params: &Parameters) -> Result<(), String> {
    if let Some(unknown) = params
        .keys()
        .find(|key| !schema.iter().any(|spec| &spec.name == *key))
    {
        return Err(format!("unknown parameter '{}'", unknown));
    }

    for spec in schema {
        match params.get(&spec.name) {
            None | Some(Value::Null) if spec.required => {
                return Err(format!("missing required parameter '{}'", spec.name));
            }
            None | Some(Value::Null) => {}
            Some(value) if !spec.kind.matches(value) => {
                return Err(format!(
                    "parameter '{}' must be of type {}, got {}",
                    spec.name,
                    spec.kind,
                    json_type_name(value)
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Render an input contract as a JSON Schema object for function calling.
pub fn to_json_schema(schema: &[ParamSpec]) -> Value {
    let mut properties = serde_json::Map::new();
    for spec in schema {
        properties.insert(
            spec.name.clone(),
            json!({
                "type": spec.kind.to_string(),
                "description": spec.description,
            }),
        );
    }
    let required: Vec<&str> = schema
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_schema() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("command", ParamType::String, "command line"),
            ParamSpec::optional("timeout", ParamType::Integer, "seconds"),
        ]
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_required_and_optional() {
        let schema = shell_schema();
        assert!(validate(&schema, &params(json!({"command": "ls"}))).is_ok());
        assert!(validate(&schema, &params(json!({"command": "ls", "timeout": 5}))).is_ok());
    }

    #[test]
    fn rejects_unknown_key() {
        let err = validate(&shell_schema(), &params(json!({"command": "ls", "cwd": "/"})))
            .unwrap_err();
        assert_eq!(err, "unknown parameter 'cwd'");
    }

    #[test]
    fn rejects_missing_required() {
        let err = validate(&shell_schema(), &params(json!({"timeout": 5}))).unwrap_err();
        assert_eq!(err, "missing required parameter 'command'");

        let err = validate(&shell_schema(), &params(json!({"command": null}))).unwrap_err();
        assert_eq!(err, "missing required parameter 'command'");
    }

    #[test]
    fn rejects_type_mismatch() {
        let err = validate(&shell_schema(), &params(json!({"command": "ls", "timeout": "5"})))
            .unwrap_err();
        assert_eq!(err, "parameter 'timeout' must be of type integer, got string");

        let err = validate(&shell_schema(), &params(json!({"command": "ls", "timeout": 1.5})))
            .unwrap_err();
        assert!(err.contains("got number"));
    }

    #[test]
    fn json_schema_lists_required_fields() {
        let schema = to_json_schema(&shell_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["timeout"]["type"], "integer");
        assert_eq!(schema["required"], json!(["command"]));
    }
}
