use thiserror::Error;

use deskmate_core::error::DeskmateError;

/// Errors raised while dispatching a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("CRM error: {0}")]
    Crm(String),
}

impl From<ToolError> for DeskmateError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Crm(msg) => DeskmateError::Http(msg),
            other => DeskmateError::InvalidInput(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Crm(err.to_string())
    }
}
