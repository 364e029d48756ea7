//! Read-only aggregate queries over feedback and shortcuts.
//!
//! These back the learning, personalization and report analyzers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deskmate_core::error::DeskmateError;
use deskmate_core::types::FeedbackRecord;

use crate::db::Database;
use crate::repository::{from_epoch, row_to_feedback};

/// Positive / negative rating totals for a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub positive: u64,
    pub negative: u64,
}

impl RatingCounts {
    pub fn total(&self) -> u64 {
        self.positive + self.negative
    }
}

/// A user ranked by the amount of feedback submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub username: String,
    pub feedback_count: u64,
}

/// Query service for feedback analysis.
pub struct FeedbackQueries {
    db: Arc<Database>,
}

impl FeedbackQueries {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Negative feedback that carries a correction, newest first.
    pub fn negative_with_corrections_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackRecord>, DeskmateError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, user_query, bot_response, rating, correction, timestamp
                     FROM feedback
                     WHERE rating = -1 AND correction IS NOT NULL AND timestamp >= ?1
                     ORDER BY timestamp DESC, id DESC",
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![since.timestamp()], row_to_feedback)
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }

    /// Rating totals for feedback at or after `since`.
    pub fn rating_counts_since(&self, since: DateTime<Utc>) -> Result<RatingCounts, DeskmateError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT
                    COALESCE(SUM(CASE WHEN rating = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN rating = -1 THEN 1 ELSE 0 END), 0)
                 FROM feedback WHERE timestamp >= ?1",
                rusqlite::params![since.timestamp()],
                |row| {
                    let positive: i64 = row.get(0)?;
                    let negative: i64 = row.get(1)?;
                    Ok(RatingCounts {
                        positive: positive as u64,
                        negative: negative as u64,
                    })
                },
            )
            .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }

    /// Users with the most feedback at or after `since`.
    pub fn most_active_users_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<UserActivity>, DeskmateError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT u.username, COUNT(f.id) AS feedback_count
                     FROM feedback f
                     JOIN users u ON u.id = f.user_id
                     WHERE f.timestamp >= ?1
                     GROUP BY u.id, u.username
                     ORDER BY feedback_count DESC, u.username ASC
                     LIMIT ?2",
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![since.timestamp(), limit], |row| {
                    let count: i64 = row.get(1)?;
                    Ok(UserActivity {
                        username: row.get(0)?,
                        feedback_count: count as u64,
                    })
                })
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }

    /// Queries the user rated positively, newest first.
    pub fn recent_positive_queries(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<String>, DeskmateError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT user_query FROM feedback
                     WHERE user_id = ?1 AND rating = 1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2",
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| row.get(0))
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<String>, _>>()
                .map_err(|e| DeskmateError::Storage(e.to_string()))
        })
    }

    /// Timestamp of the user's newest shortcut.
    pub fn last_shortcut_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>, DeskmateError> {
        self.db.with_conn(|conn| {
            let latest: Option<i64> = conn
                .query_row(
                    "SELECT MAX(timestamp) FROM shortcuts WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .map_err(|e| DeskmateError::Storage(e.to_string()))?;
            Ok(latest.map(from_epoch))
        })
    }
}
