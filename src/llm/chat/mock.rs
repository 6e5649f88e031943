//! Scripted chat client for running the orchestrator without a provider.
//!
//! Replies are consumed in order; every request is recorded so callers can
//! inspect what would have been sent over the wire.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ ChatClient, ProviderRequest };
use crate::llm::{ LlmError, LlmType };

pub struct MockChatClient {
    llm_type: LlmType,
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockChatClient {
    pub fn new(llm_type: LlmType, script: Vec<Result<String, String>>) -> Self {
        Self {
            llm_type,
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(llm_type: LlmType, reply: &str) -> Self {
        Self::new(llm_type, vec![Ok(reply.to_string())])
    }

    pub fn failing(llm_type: LlmType, error: &str) -> Self {
        Self::new(llm_type, vec![Err(error.to_string())])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, request: &ProviderRequest) -> Result<String, LlmError> {
        match self.requests.lock() {
            Ok(mut r) => r.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        let next = match self.script.lock() {
            Ok(mut s) => s.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };

        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(LlmError::Status { status: 503, body }),
            None => Err(LlmError::Malformed("mock script exhausted".to_string())),
        }
    }

    fn get_model(&self) -> String {
        format!("mock-{}", self.llm_type.label().to_lowercase())
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }

    fn llm_type(&self) -> LlmType {
        self.llm_type
    }
}
