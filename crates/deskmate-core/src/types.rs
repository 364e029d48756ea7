use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeskmateError;

// =============================================================================
// Enums
// =============================================================================

/// A user's verdict on a single answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Rating {
    Satisfied,
    Unsatisfied,
}

impl Rating {
    pub fn as_i64(self) -> i64 {
        match self {
            Rating::Satisfied => 1,
            Rating::Unsatisfied => -1,
        }
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        rating.as_i64()
    }
}

impl TryFrom<i64> for Rating {
    type Error = DeskmateError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Satisfied),
            -1 => Ok(Rating::Unsatisfied),
            other => Err(DeskmateError::InvalidInput(format!(
                "rating must be 1 or -1, got {}",
                other
            ))),
        }
    }
}

/// Access level of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Speaker of a logged conversation line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Model,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Model => "model",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "model" => Speaker::Model,
            _ => Speaker::User,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// An authenticated account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A saved quick-access prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Feedback submitted for one answer, before it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub user_id: i64,
    pub user_query: String,
    pub bot_response: String,
    pub rating: Rating,
    pub correction: Option<String>,
}

/// A stored feedback row. Never updated after insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub user_id: i64,
    pub user_query: String,
    pub bot_response: String,
    pub rating: Rating,
    pub correction: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One line of the persisted conversation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub user_id: i64,
    pub session_id: String,
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_conversions() {
        assert_eq!(Rating::try_from(1).unwrap(), Rating::Satisfied);
        assert_eq!(Rating::try_from(-1).unwrap(), Rating::Unsatisfied);
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(5).is_err());
        assert_eq!(i64::from(Rating::Unsatisfied), -1);
    }

    #[test]
    fn test_rating_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Rating::Satisfied).unwrap(), "1");
        let parsed: Rating = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, Rating::Unsatisfied);
        assert!(serde_json::from_str::<Rating>("2").is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("anything"), Role::User);
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    #[test]
    fn test_user_is_admin() {
        let user = User {
            id: 1,
            username: "ana".into(),
            role: Role::Admin,
        };
        assert!(user.is_admin());
    }
}
