use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Completion, FinishReason, Provider, Usage};

/// A mock provider that returns pre-configured responses and records every request.
/// Clones share the same script and request log.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<(Message, FinishReason)>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<(Message, FinishReason)>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The conversation sent with each call, in order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<Completion> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(anyhow!("MockProvider ran out of scripted responses"));
        }
        let (message, finish_reason) = responses.remove(0);
        Ok(Completion {
            message,
            finish_reason,
            usage: Usage::default(),
        })
    }
}
