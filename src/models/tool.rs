use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the remote service runs itself, declared to the model by name only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool, e.g. `$web_search`
    pub name: String,
}

impl Tool {
    pub fn builtin<N: Into<String>>(name: N) -> Self {
        Tool { name: name.into() }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution, as decoded from the model's JSON string
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}
