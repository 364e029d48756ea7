//! Application state shared across all route handlers.
//!
//! AppState holds the configuration, the database and the session
//! registry. It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use deskmate_chat::SessionRegistry;
use deskmate_core::config::DeskmateConfig;
use deskmate_storage::Database;

use crate::rate_limit::RateLimiter;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<DeskmateConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    /// Live conversation sessions, one per user.
    pub sessions: Arc<SessionRegistry>,
    /// Process-wide limiter for authenticated routes.
    pub limiter: RateLimiter,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: DeskmateConfig, database: Arc<Database>, sessions: SessionRegistry) -> Self {
        let limiter = RateLimiter::new(u64::from(config.server.rate_limit_per_sec));
        Self {
            config: Arc::new(config),
            database,
            sessions: Arc::new(sessions),
            limiter,
            start_time: Instant::now(),
        }
    }
}
