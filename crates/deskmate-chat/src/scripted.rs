//! Scripted model provider for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChatError;
use crate::provider::ModelProvider;
use crate::types::{ModelReply, ToolCall, Turn};

/// Provider that replays a fixed queue of replies.
///
/// Records every history it was called with. Only compiled for tests, or
/// for downstream test suites through the `scripted` feature.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ModelReply, String>>>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a terminal text answer.
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.push(Ok(ModelReply::Text(text.into())))
    }

    /// Queue a tool call.
    pub fn push_tool_call(&self, name: impl Into<String>, args: Value) -> &Self {
        self.push(Ok(ModelReply::ToolCall(ToolCall {
            name: name.into(),
            args,
        })))
    }

    /// Queue a provider failure.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.push(Err(message.into()))
    }

    fn push(&self, reply: Result<ModelReply, String>) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    /// Histories received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn generate(&self, history: &[Turn], _tools: &[Value]) -> Result<ModelReply, ChatError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(history.to_vec());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| ChatError::Provider(format!("script lock poisoned: {e}")))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Provider(message)),
            None => Err(ChatError::Provider("script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("find_ramal_by_name", json!({"nome": "ana"}))
            .push_text("pronto");

        let history = vec![Turn::user("ramal da ana")];
        let first = provider.generate(&history, &[]).await.unwrap();
        assert!(matches!(first, ModelReply::ToolCall(call) if call.name == "find_ramal_by_name"));
        let second = provider.generate(&history, &[]).await.unwrap();
        assert_eq!(second, ModelReply::Text("pronto".into()));

        assert!(provider.generate(&history, &[]).await.is_err());
        assert_eq!(provider.calls().len(), 3);
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let provider = ScriptedProvider::new();
        provider.push_error("quota");
        let err = provider.generate(&[], &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider(msg) if msg == "quota"));
    }
}
