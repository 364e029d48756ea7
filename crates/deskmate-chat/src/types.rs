//! Conversation history types shared by the session, the exchange loop and
//! the model providers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a history turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Model,
    /// Result of a locally executed tool.
    Function,
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// One piece of a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(ToolCall),
    FunctionResponse { name: String, response: Value },
}

/// One entry of the conversation history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part::FunctionCall(call)],
        }
    }

    pub fn tool_result(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: TurnRole::Function,
            parts: vec![Part::FunctionResponse {
                name: name.into(),
                response,
            }],
        }
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// What the model answered to one submission.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    /// Terminal answer for the user.
    Text(String),
    /// Run this tool and resubmit with its result.
    ToolCall(ToolCall),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_constructors() {
        assert_eq!(Turn::user("oi").role, TurnRole::User);
        assert_eq!(Turn::model("olá").text(), "olá");

        let call = Turn::tool_call(ToolCall {
            name: "find_ramal_by_name".into(),
            args: json!({"nome": "aninha"}),
        });
        assert_eq!(call.role, TurnRole::Model);
        assert_eq!(call.text(), "");

        let result = Turn::tool_result("find_ramal_by_name", json!([]));
        assert_eq!(result.role, TurnRole::Function);
    }
}
