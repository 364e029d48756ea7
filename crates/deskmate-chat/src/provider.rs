//! Language-model provider abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChatError;
use crate::types::{ModelReply, Turn};

/// A chat model that supports function calling.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Submit the whole history plus the available function declarations
    /// and return the model's next move.
    async fn generate(&self, history: &[Turn], tools: &[Value]) -> Result<ModelReply, ChatError>;
}
