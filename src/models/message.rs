use super::role::Role;
use super::tool::ToolCall;
use crate::errors::{ToolError, ToolResult};
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRequest {
    pub id: String,
    /// Tool name exactly as the model sent it
    pub name: String,
    /// Argument string exactly as the model sent it; echoed back verbatim
    pub arguments: String,
    /// The decoded call, or why it could not be decoded
    pub tool_call: ToolResult<ToolCall>,
}

impl ToolRequest {
    /// Decode a raw tool call from the model, keeping the raw parts alongside.
    pub fn decode<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        let id = id.into();
        let name = name.into();
        let arguments = arguments.into();

        let tool_call = if !is_valid_function_name(&name) {
            Err(ToolError::ToolNotFound(name.clone()))
        } else {
            serde_json::from_str::<Value>(&arguments)
                .map(|params| ToolCall::new(&name, params))
                .map_err(|e| {
                    ToolError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ))
                })
        };

        Self {
            id,
            name,
            arguments,
            tool_call,
        }
    }
}

// builtin tools are prefixed with `$`, e.g. `$web_search`
fn is_valid_function_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$?[a-zA-Z0-9_-]+$").expect("valid regex"))
        .is_match(name)
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    pub id: String,
    /// Name of the tool that was called, echoed back on the wire
    pub name: String,
    pub tool_result: ToolResult<Value>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// Content passed inside a message, which can be both simple content and tool content
pub enum MessageContent {
    Text(TextContent),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent { text: text.into() })
    }

    pub fn tool_request<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        MessageContent::ToolRequest(ToolRequest::decode(id, name, arguments))
    }

    pub fn tool_response<S, N>(id: S, name: N, tool_result: ToolResult<Value>) -> Self
    where
        S: Into<String>,
        N: Into<String>,
    {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            name: name.into(),
            tool_result,
        })
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let MessageContent::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message {
            role: Role::User,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add a raw tool request, as received from the model
    pub fn with_tool_request<I, N, A>(self, id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        self.with_content(MessageContent::tool_request(id, name, arguments))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<S, N>(self, id: S, name: N, result: ToolResult<Value>) -> Self
    where
        S: Into<String>,
        N: Into<String>,
    {
        self.with_content(MessageContent::tool_response(id, name, result))
    }

    /// All text content joined together, or None when the message carries no text
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|content| content.as_text())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(|content| content.as_tool_request())
            .collect()
    }
}
