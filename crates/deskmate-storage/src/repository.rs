//! Repository implementations for SQLite-backed persistence.
//!
//! One repository per table. Every repository shares the same
//! [`Database`] through an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use serde_json::{Map, Value};
use tracing::debug;

use deskmate_core::error::DeskmateError;
use deskmate_core::types::{
    ConversationEntry, FeedbackRecord, NewFeedback, Rating, Role, Shortcut, Speaker, User,
};

use crate::db::Database;

// =============================================================================
// Users
// =============================================================================

/// Accounts and their API tokens.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create an account bound to `token`. Usernames and tokens are unique.
    pub fn create(&self, username: &str, role: Role, token: &str) -> Result<User, DeskmateError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, role, api_token) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, role.as_str(), token],
            )
            .map_err(|e| DeskmateError::Storage(format!("Failed to create user: {}", e)))?;
            Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                role,
            })
        })
    }

    /// Resolve a bearer token to its account.
    pub fn find_by_token(&self, token: &str) -> Result<Option<User>, DeskmateError> {
        self.find_one("SELECT id, username, role FROM users WHERE api_token = ?1", token)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, DeskmateError> {
        self.find_one("SELECT id, username, role FROM users WHERE username = ?1", username)
    }

    fn find_one(&self, sql: &str, arg: &str) -> Result<Option<User>, DeskmateError> {
        self.db.with_conn(|conn| {
            conn.query_row(sql, rusqlite::params![arg], |row| {
                let role: String = row.get(2)?;
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    role: Role::parse(&role),
                })
            })
            .optional()
            .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }
}

// =============================================================================
// Knowledge base
// =============================================================================

/// Keyed JSON documents that seed every conversation session.
pub struct KnowledgeRepository {
    db: Arc<Database>,
}

impl KnowledgeRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fetch the content stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Value>, DeskmateError> {
        let raw: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT content FROM knowledge_base WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DeskmateError::Storage(e.to_string()))
        })?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the content under `key`.
    ///
    /// Returns `true` when the key did not exist before.
    pub fn upsert(&self, key: &str, content: &Value) -> Result<bool, DeskmateError> {
        let text = serde_json::to_string(content)?;
        self.db.with_conn(|conn| {
            let existed: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM knowledge_base WHERE key = ?1)",
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;

            conn.execute(
                "INSERT INTO knowledge_base (key, content, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                    content = excluded.content,
                    updated_at = excluded.updated_at",
                rusqlite::params![key, text],
            )
            .map_err(|e| DeskmateError::Storage(format!("Failed to save knowledge: {}", e)))?;

            debug!(key, created = !existed, "Knowledge entry written");
            Ok(!existed)
        })
    }

    /// Load every entry, ordered by key. Used to build session snapshots.
    pub fn load_all(&self) -> Result<Map<String, Value>, DeskmateError> {
        let rows: Vec<(String, String)> = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT key, content FROM knowledge_base ORDER BY key")
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })?;

        let mut snapshot = Map::new();
        for (key, text) in rows {
            snapshot.insert(key, serde_json::from_str(&text)?);
        }
        Ok(snapshot)
    }
}

// =============================================================================
// Shortcuts
// =============================================================================

/// Per-user saved prompts.
pub struct ShortcutRepository {
    db: Arc<Database>,
}

impl ShortcutRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a shortcut. Empty or whitespace-only text is rejected.
    pub fn add(&self, user_id: i64, text: &str) -> Result<Shortcut, DeskmateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DeskmateError::InvalidInput(
                "shortcut text must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shortcuts (user_id, text, timestamp) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, text, now.timestamp()],
            )
            .map_err(|e| DeskmateError::Storage(format!("Failed to save shortcut: {}", e)))?;
            Ok(Shortcut {
                id: conn.last_insert_rowid(),
                user_id,
                text: text.to_string(),
                timestamp: from_epoch(now.timestamp()),
            })
        })
    }

    /// All shortcuts of a user, newest first.
    pub fn list(&self, user_id: i64) -> Result<Vec<Shortcut>, DeskmateError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, text, timestamp FROM shortcuts
                     WHERE user_id = ?1 ORDER BY id DESC",
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok(Shortcut {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        text: row.get(2)?,
                        timestamp: from_epoch(row.get(3)?),
                    })
                })
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }

    /// Delete a shortcut owned by `user_id`.
    ///
    /// Returns `false` if it does not exist or belongs to someone else.
    pub fn delete(&self, user_id: i64, shortcut_id: i64) -> Result<bool, DeskmateError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM shortcuts WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![shortcut_id, user_id],
                )
                .map_err(|e| DeskmateError::Storage(format!("Failed to delete shortcut: {}", e)))?;
            Ok(affected > 0)
        })
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Append-only store of answer ratings.
pub struct FeedbackRepository {
    db: Arc<Database>,
}

impl FeedbackRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record feedback timestamped now.
    pub fn insert(&self, feedback: &NewFeedback) -> Result<FeedbackRecord, DeskmateError> {
        self.insert_at(feedback, Utc::now())
    }

    /// Record feedback with an explicit timestamp.
    pub fn insert_at(
        &self,
        feedback: &NewFeedback,
        at: DateTime<Utc>,
    ) -> Result<FeedbackRecord, DeskmateError> {
        let correction = feedback
            .correction
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (user_id, user_query, bot_response, rating, correction, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    feedback.user_id,
                    feedback.user_query,
                    feedback.bot_response,
                    feedback.rating.as_i64(),
                    correction,
                    at.timestamp(),
                ],
            )
            .map_err(|e| DeskmateError::Storage(format!("Failed to save feedback: {}", e)))?;

            Ok(FeedbackRecord {
                id: conn.last_insert_rowid(),
                user_id: feedback.user_id,
                user_query: feedback.user_query.clone(),
                bot_response: feedback.bot_response.clone(),
                rating: feedback.rating,
                correction,
                timestamp: from_epoch(at.timestamp()),
            })
        })
    }

    /// Fetch a feedback row by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<FeedbackRecord>, DeskmateError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, user_query, bot_response, rating, correction, timestamp
                 FROM feedback WHERE id = ?1",
                rusqlite::params![id],
                row_to_feedback,
            )
            .optional()
            .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }
}

/// Map a full feedback row (id, user_id, user_query, bot_response, rating,
/// correction, timestamp).
pub(crate) fn row_to_feedback(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    let rating: i64 = row.get(4)?;
    let rating = Rating::try_from(rating).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    Ok(FeedbackRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_query: row.get(2)?,
        bot_response: row.get(3)?,
        rating,
        correction: row.get(5)?,
        timestamp: from_epoch(row.get(6)?),
    })
}

// =============================================================================
// Conversation log
// =============================================================================

/// Persistent log of user messages and final replies.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn append(
        &self,
        user_id: i64,
        session_id: &str,
        speaker: Speaker,
        content: &str,
    ) -> Result<(), DeskmateError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversation_history (user_id, session_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user_id,
                    session_id,
                    speaker.as_str(),
                    content,
                    Utc::now().timestamp()
                ],
            )
            .map_err(|e| {
                DeskmateError::Storage(format!("Failed to log conversation line: {}", e))
            })?;
            Ok(())
        })
    }

    /// Most recent lines of a user, newest first.
    pub fn recent(&self, user_id: i64, limit: u32) -> Result<Vec<ConversationEntry>, DeskmateError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, session_id, role, content, timestamp
                     FROM conversation_history
                     WHERE user_id = ?1
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    let role: String = row.get(3)?;
                    Ok(ConversationEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        session_id: row.get(2)?,
                        speaker: Speaker::parse(&role),
                        content: row.get(4)?,
                        timestamp: from_epoch(row.get(5)?),
                    })
                })
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }
}

pub(crate) fn from_epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn make_user(db: &Arc<Database>, name: &str) -> User {
        UserRepository::new(db.clone())
            .create(name, Role::User, &format!("token-{}", name))
            .unwrap()
    }

    // ---- Users ----

    #[test]
    fn test_user_create_and_find_by_token() {
        let db = make_db();
        let repo = UserRepository::new(db);
        let created = repo.create("ana", Role::Admin, "secret").unwrap();

        let found = repo.find_by_token("secret").unwrap().unwrap();
        assert_eq!(found, created);
        assert!(found.is_admin());
        assert!(repo.find_by_token("other").unwrap().is_none());
        assert_eq!(repo.find_by_username("ana").unwrap().unwrap().id, created.id);
    }

    #[test]
    fn test_user_duplicate_username_rejected() {
        let db = make_db();
        let repo = UserRepository::new(db);
        repo.create("ana", Role::User, "t1").unwrap();
        let err = repo.create("ana", Role::User, "t2").unwrap_err();
        assert!(matches!(err, DeskmateError::Storage(_)));
    }

    // ---- Knowledge ----

    #[test]
    fn test_knowledge_upsert_reports_creation() {
        let repo = KnowledgeRepository::new(make_db());
        assert!(repo.upsert("history", &json!("Fundada em 1990.")).unwrap());
        assert!(!repo.upsert("history", &json!("Fundada em 1991.")).unwrap());
        assert_eq!(repo.get("history").unwrap(), Some(json!("Fundada em 1991.")));
        assert_eq!(repo.get("missing").unwrap(), None);
    }

    #[test]
    fn test_knowledge_load_all_preserves_nested_order() {
        let repo = KnowledgeRepository::new(make_db());
        let departments = json!({
            "ti": [{"ramal": "210", "equipe": [{"nome": "Ana Souza", "apelidos": ["Aninha"]}]}],
            "fiscal": [{"ramal": "220", "equipe": []}]
        });
        repo.upsert("departments", &departments).unwrap();
        repo.upsert("history", &json!({"text": "..."})).unwrap();

        let snapshot = repo.load_all().unwrap();
        assert_eq!(snapshot.len(), 2);
        let keys: Vec<&String> = snapshot["departments"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["ti", "fiscal"]);
    }

    // ---- Shortcuts ----

    #[test]
    fn test_shortcut_add_list_delete() {
        let db = make_db();
        let ana = make_user(&db, "ana");
        let bruno = make_user(&db, "bruno");
        let repo = ShortcutRepository::new(db);

        let first = repo.add(ana.id, "Ramal do fiscal").unwrap();
        let second = repo.add(ana.id, "  Prazo do ICMS  ").unwrap();
        assert_eq!(second.text, "Prazo do ICMS");

        let listed = repo.list(ana.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        assert!(!repo.delete(bruno.id, first.id).unwrap());
        assert!(repo.delete(ana.id, first.id).unwrap());
        assert!(!repo.delete(ana.id, first.id).unwrap());
        assert_eq!(repo.list(ana.id).unwrap().len(), 1);
    }

    #[test]
    fn test_shortcut_empty_text_rejected() {
        let db = make_db();
        let ana = make_user(&db, "ana");
        let repo = ShortcutRepository::new(db);
        let err = repo.add(ana.id, "   ").unwrap_err();
        assert!(matches!(err, DeskmateError::InvalidInput(_)));
    }

    // ---- Feedback ----

    #[test]
    fn test_feedback_insert_and_find() {
        let db = make_db();
        let ana = make_user(&db, "ana");
        let repo = FeedbackRepository::new(db);

        let stored = repo
            .insert(&NewFeedback {
                user_id: ana.id,
                user_query: "ramal do fiscal".into(),
                bot_response: "Não sei".into(),
                rating: Rating::Unsatisfied,
                correction: Some("  É o 220  ".into()),
            })
            .unwrap();
        assert_eq!(stored.correction.as_deref(), Some("É o 220"));

        let found = repo.find_by_id(stored.id).unwrap().unwrap();
        assert_eq!(found, stored);
    }

    #[test]
    fn test_feedback_blank_correction_stored_as_null() {
        let db = make_db();
        let ana = make_user(&db, "ana");
        let repo = FeedbackRepository::new(db);
        let stored = repo
            .insert(&NewFeedback {
                user_id: ana.id,
                user_query: "q".into(),
                bot_response: "r".into(),
                rating: Rating::Satisfied,
                correction: Some("   ".into()),
            })
            .unwrap();
        assert!(stored.correction.is_none());
    }

    // ---- Conversation log ----

    #[test]
    fn test_conversation_log_newest_first() {
        let db = make_db();
        let ana = make_user(&db, "ana");
        let repo = ConversationRepository::new(db);
        repo.append(ana.id, "s1", Speaker::User, "ramal da aninha").unwrap();
        repo.append(ana.id, "s1", Speaker::Model, "O ramal é 210").unwrap();

        let lines = repo.recent(ana.id, 10).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, Speaker::Model);
        assert_eq!(lines[1].content, "ramal da aninha");
        assert_eq!(repo.recent(ana.id, 1).unwrap().len(), 1);
    }
}
