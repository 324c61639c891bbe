use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{FetchError, ToolError, ToolResult};
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Provider;

/// Moonshot's builtin search; the service runs the search itself
pub const WEB_SEARCH_TOOL: &str = "$web_search";

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 20;

const SYSTEM_PROMPT: &str = "你是一个专业的科技新闻编辑，善于搜索和整理最新的科技新闻。\
请确保新闻的真实性和时效性，并以markdown格式输出内容。";

fn user_prompt(date_label: &str) -> String {
    format!(
        "请搜索并汇总{date_label}的科技技术以及计算机编程相关的热点新闻。要求：\n\
         1. 使用搜索工具查询最新新闻，必须是当天发布的新闻\n\
         2. 新闻内容详细清晰，并给出新闻引用链接\n\
         3. 按照重要性排序，最好能够汇总10个左右的热点新闻\n\
         4. 使用markdown格式输出，包含标题、简介和来源链接"
    )
}

/// Asks the model for the day's news, answering its search tool calls until it
/// produces a final answer.
pub struct NewsFetcher {
    provider: Box<dyn Provider>,
    max_tool_rounds: usize,
}

impl NewsFetcher {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Returns the final answer's text, or None when the model sent no content.
    pub async fn fetch(&self, date_label: &str) -> Result<Option<String>> {
        if date_label.trim().is_empty() {
            return Err(FetchError::EmptyDateLabel.into());
        }

        let tools = vec![Tool::builtin(WEB_SEARCH_TOOL)];
        let mut messages = vec![Message::user().with_text(user_prompt(date_label))];
        let mut rounds = 0;

        loop {
            let completion = self
                .provider
                .complete(SYSTEM_PROMPT, &messages, &tools)
                .await?;
            debug!(
                round = rounds,
                finish_reason = ?completion.finish_reason,
                total_tokens = ?completion.usage.total_tokens,
                "model responded"
            );

            if !completion.finish_reason.is_tool_calls() {
                return Ok(completion.message.text());
            }
            if rounds == self.max_tool_rounds {
                return Err(FetchError::TooManyToolRounds(rounds).into());
            }
            rounds += 1;

            let mut tool_responses = Message::user();
            for request in completion.message.tool_requests() {
                let name = &request.name;
                let result = match &request.tool_call {
                    Ok(call) => dispatch_tool_call(call),
                    Err(e @ ToolError::ToolNotFound(_)) => Err(e.clone()),
                    Err(e) => {
                        return Err(FetchError::MalformedToolCall {
                            id: request.id.clone(),
                            source: e.clone(),
                        }
                        .into())
                    }
                };
                if let Err(e) = &result {
                    warn!(tool = %name, "{}", e);
                } else {
                    info!(tool = %name, "answering tool call {}", request.id);
                }
                tool_responses = tool_responses.with_tool_response(&request.id, name, result);
            }

            messages.push(completion.message);
            messages.push(tool_responses);
        }
    }
}

/// The search runs server-side, so answering it means handing the arguments back unchanged.
fn dispatch_tool_call(call: &ToolCall) -> ToolResult<Value> {
    match call.name.as_str() {
        WEB_SEARCH_TOOL => Ok(call.arguments.clone()),
        other => Err(ToolError::ToolNotFound(other.to_string())),
    }
}
