//! Read-only view over the knowledge base, captured when a session starts.

use serde_json::{Map, Value};

use crate::directory::Directory;

/// Key holding the staff directory.
pub const DEPARTMENTS_KEY: &str = "departments";
/// Key holding the organization's narrative history.
pub const HISTORY_KEY: &str = "history";

/// Knowledge entries frozen at session construction.
///
/// Later writes to the knowledge base are not visible here; the session
/// registry drops sessions instead.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSnapshot {
    entries: Map<String, Value>,
}

impl KnowledgeSnapshot {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The staff directory, if one is stored and not empty.
    pub fn directory(&self) -> Option<Directory> {
        self.get(DEPARTMENTS_KEY)
            .map(Directory::from_value)
            .filter(|d| !d.is_empty())
    }

    /// History text stored either as a plain string or as `{"text": ...}`.
    pub fn history_text(&self) -> Option<&str> {
        let value = self.get(HISTORY_KEY)?;
        value
            .as_str()
            .or_else(|| value.get("text").and_then(Value::as_str))
            .filter(|t| !t.trim().is_empty())
    }
}
