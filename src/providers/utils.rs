use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::Tool;

/// Convert internal Message format to OpenAI's API message specification
///   tool responses are carried inside a single message internally, but each one
///   becomes its own `tool` role message on the wire
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        converted["content"] = json!(text.text);
                    }
                }
                // echoed exactly as received, whether or not it decoded; the
                // matching response is always a separate ToolResponse
                MessageContent::ToolRequest(request) => {
                    tool_calls.push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": request.name,
                            "arguments": request.arguments,
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let content = match &response.tool_result {
                        Ok(value) => value.to_string(),
                        Err(e) => encode_tool_error(e),
                    };
                    output.push(json!({
                        "role": "tool",
                        "tool_call_id": response.id,
                        "name": response.name,
                        "content": content,
                    }));
                }
            }
        }

        if !tool_calls.is_empty() {
            if converted.get("content").is_none() {
                converted["content"] = json!("");
            }
            converted["tool_calls"] = json!(tool_calls);
        }
        if converted.get("content").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Tool errors travel as a JSON string so the model sees the same encoding as a result
fn encode_tool_error(error: &ToolError) -> String {
    Value::String(format!("Error: {}", error)).to_string()
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "builtin_function",
            "function": {
                "name": tool.name,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;
    let mut content = Vec::new();

    if let Some(text) = original.get("content").and_then(|t| t.as_str()) {
        content.push(MessageContent::text(text));
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default();
            let function_name = tool_call["function"]["name"].as_str().unwrap_or_default();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            content.push(MessageContent::tool_request(id, function_name, arguments));
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

/// The `finish_reason` of the first choice, if any
pub fn openai_finish_reason(response: &Value) -> Option<&str> {
    response["choices"][0]["finish_reason"].as_str()
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolCall;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "1",
                    "type": "function",
                    "function": {
                        "name": "$web_search",
                        "arguments": "{\"query\": \"rust 1.80\"}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_openai_spec() -> Result<()> {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
        Ok(())
    }

    #[test]
    fn test_messages_to_openai_spec_tool_round() -> Result<()> {
        let messages = vec![
            Message::assistant().with_tool_request("call_1", "$web_search", r#"{"query": "ai"}"#),
            Message::user().with_tool_response("call_1", "$web_search", Ok(json!({"query": "ai"}))),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0]["role"], "assistant");
        assert_eq!(spec[0]["content"], "");
        assert_eq!(spec[0]["tool_calls"][0]["id"], "call_1");
        assert_eq!(spec[0]["tool_calls"][0]["type"], "function");
        assert_eq!(spec[0]["tool_calls"][0]["function"]["name"], "$web_search");
        assert_eq!(
            spec[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"query": "ai"}"#
        );
        assert_eq!(spec[1]["role"], "tool");
        assert_eq!(spec[1]["tool_call_id"], "call_1");
        assert_eq!(spec[1]["name"], "$web_search");
        assert_eq!(spec[1]["content"], r#"{"query":"ai"}"#);
        Ok(())
    }

    #[test]
    fn test_undecodable_request_still_echoed_once() {
        let messages = vec![
            Message::assistant().with_tool_request("call_x", "web.search", r#"{"q":1}"#),
            Message::user().with_tool_response(
                "call_x",
                "web.search",
                Err(ToolError::ToolNotFound("web.search".to_string())),
            ),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0]["role"], "assistant");
        assert_eq!(spec[0]["tool_calls"][0]["function"]["name"], "web.search");
        assert_eq!(spec[0]["tool_calls"][0]["function"]["arguments"], r#"{"q":1}"#);
        assert_eq!(spec[1]["role"], "tool");
        assert_eq!(spec[1]["tool_call_id"], "call_x");
        assert_eq!(
            spec[1]["content"],
            r#""Error: unable to find tool by name 'web.search'""#
        );
    }

    #[test]
    fn test_large_integers_echoed_exactly() -> Result<()> {
        let raw = r#"{"search_id":12345678901234567890123}"#;
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "$web_search", "arguments": raw}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let request_message = openai_response_to_message(&response)?;
        let arguments = request_message.tool_requests()[0]
            .tool_call
            .clone()
            .unwrap()
            .arguments;
        let messages = vec![
            request_message,
            Message::user().with_tool_response("call_1", "$web_search", Ok(arguments)),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec[0]["tool_calls"][0]["function"]["arguments"], raw);
        assert_eq!(spec[1]["content"], raw);
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let spec = tools_to_openai_spec(&[Tool::builtin("$web_search")])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(
            spec[0],
            json!({"type": "builtin_function", "function": {"name": "$web_search"}})
        );
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let tools = [Tool::builtin("$web_search"), Tool::builtin("$web_search")];
        let result = tools_to_openai_spec(&tools);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_openai_response_to_message_text() -> Result<()> {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "# Today"},
                "finish_reason": "stop"
            }]
        });

        let message = openai_response_to_message(&response)?;

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text().as_deref(), Some("# Today"));
        assert_eq!(openai_finish_reason(&response), Some("stop"));
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_valid_tooluse() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        let message = openai_response_to_message(&response)?;

        let requests = message.tool_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "1");
        assert_eq!(requests[0].arguments, r#"{"query": "rust 1.80"}"#);
        assert_eq!(
            requests[0].tool_call,
            Ok(ToolCall::new("$web_search", json!({"query": "rust 1.80"})))
        );
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_invalid_func_name() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] =
            json!("invalid fn");

        let message = openai_response_to_message(&response)?;

        let request = message.tool_requests()[0];
        assert_eq!(request.name, "invalid fn");
        match &request.tool_call {
            Err(ToolError::ToolNotFound(name)) => assert_eq!(name, "invalid fn"),
            other => panic!("Expected ToolNotFound error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_openai_response_to_message_json_decode_error() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("invalid json {");

        let message = openai_response_to_message(&response)?;

        assert!(matches!(
            message.tool_requests()[0].tool_call,
            Err(ToolError::InvalidParameters(_))
        ));
        Ok(())
    }

    #[test]
    fn test_openai_response_without_choices() {
        let result = openai_response_to_message(&json!({"id": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });

        let result = check_openai_context_length_error(&error);
        assert!(result.is_some());
        assert_eq!(
            result.unwrap().to_string(),
            "Context length exceeded. Message: This message is too long"
        );

        let error = json!({
            "code": "other_error",
            "message": "Some other error"
        });

        let result = check_openai_context_length_error(&error);
        assert!(result.is_none());
    }
}
