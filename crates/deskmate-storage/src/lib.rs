//! Deskmate storage crate - SQLite persistence for users, knowledge,
//! shortcuts, feedback and the conversation log.
//!
//! Provides a WAL-mode SQLite database with migrations, one repository per
//! table, and the read-only aggregate queries used by the analyzers.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;

pub use db::Database;
pub use queries::{FeedbackQueries, RatingCounts, UserActivity};
pub use repository::{
    ConversationRepository, FeedbackRepository, KnowledgeRepository, ShortcutRepository,
    UserRepository,
};
