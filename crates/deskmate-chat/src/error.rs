//! Error types for the conversation layer.

use deskmate_core::error::DeskmateError;

/// Errors from the chat engine.
///
/// Only input validation errors reach API callers; everything else is
/// turned into the apology reply inside the session.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("model provider error: {0}")]
    Provider(String),
    #[error("model call timed out after {0} seconds")]
    Timeout(u64),
    #[error("model requested more than {0} tool calls")]
    ToolLoopExceeded(u32),
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DeskmateError> for ChatError {
    fn from(err: DeskmateError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::Timeout(60).to_string(),
            "model call timed out after 60 seconds"
        );
        assert_eq!(
            ChatError::ToolLoopExceeded(5).to_string(),
            "model requested more than 5 tool calls"
        );
    }

    #[test]
    fn test_from_deskmate_error() {
        let err: ChatError = DeskmateError::Storage("locked".into()).into();
        assert!(matches!(err, ChatError::Storage(msg) if msg.contains("locked")));
    }
}
