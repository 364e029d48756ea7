//! Deskmate API crate - axum HTTP server, authentication and route handlers.
//!
//! Provides the REST API for the assistant: sessions and questions,
//! shortcuts, feedback, personalization, and the administrator routes for
//! the knowledge base and the feedback analyses.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
