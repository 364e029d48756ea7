//! Conversational core of Deskmate.
//!
//! Provides the per-user conversation session with its disambiguation
//! memory, the bounded model/tool exchange, the Gemini provider, response
//! templates, and the registry that owns live sessions.

pub mod context;
pub mod error;
pub mod exchange;
pub mod gemini;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod response;
#[cfg(any(test, feature = "scripted"))]
pub mod scripted;
pub mod session;
pub mod types;

pub use context::{DisambiguationState, Prepared};
pub use error::ChatError;
pub use exchange::{run_exchange, ExchangeLimits, ExchangeOutcome};
pub use gemini::GeminiClient;
pub use provider::ModelProvider;
pub use registry::{SessionFactory, SessionRegistry, SharedSession};
pub use response::ResponseKind;
#[cfg(any(test, feature = "scripted"))]
pub use scripted::ScriptedProvider;
pub use session::ConversationSession;
pub use types::{ModelReply, Part, ToolCall, Turn, TurnRole};
