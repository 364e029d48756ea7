//! One user's conversation: history, disambiguation memory and tools.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use deskmate_tools::{KnowledgeSnapshot, ToolRegistry};

use crate::context::{DisambiguationState, Prepared};
use crate::error::ChatError;
use crate::exchange::{run_exchange, ExchangeLimits};
use crate::prompt::initial_history;
use crate::provider::ModelProvider;
use crate::response::ResponseKind;
use crate::types::Turn;

/// A live conversation bound to one knowledge snapshot.
///
/// Sessions are created lazily by the registry and discarded whenever the
/// knowledge base changes; the next request rebuilds them from fresh data.
pub struct ConversationSession {
    user_id: i64,
    session_id: Uuid,
    knowledge: Arc<KnowledgeSnapshot>,
    history: Vec<Turn>,
    state: DisambiguationState,
    tools: ToolRegistry,
    provider: Arc<dyn ModelProvider>,
    limits: ExchangeLimits,
}

impl ConversationSession {
    pub fn new(
        user_id: i64,
        knowledge: Arc<KnowledgeSnapshot>,
        tools: ToolRegistry,
        provider: Arc<dyn ModelProvider>,
        limits: ExchangeLimits,
        assistant: &str,
        organization: &str,
    ) -> Self {
        Self {
            user_id,
            session_id: Uuid::new_v4(),
            knowledge,
            history: initial_history(assistant, organization),
            state: DisambiguationState::new(),
            tools,
            provider,
            limits,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn knowledge(&self) -> &KnowledgeSnapshot {
        &self.knowledge
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn state(&self) -> &DisambiguationState {
        &self.state
    }

    /// Answer one user message. Never fails: faults are logged and turned
    /// into the apology reply.
    pub async fn handle_message(&mut self, raw: &str) -> String {
        match self.try_handle(raw).await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    user_id = self.user_id,
                    session_id = %self.session_id,
                    error = %e,
                    "failed to answer message"
                );
                ResponseKind::ProcessingError.render()
            }
        }
    }

    async fn try_handle(&mut self, raw: &str) -> Result<String, ChatError> {
        let message = match self.state.prepare(raw) {
            Prepared::Reply(text) => return Ok(text),
            Prepared::Forward(message) => message,
        };
        debug!(user_id = self.user_id, %message, "forwarding message to model");

        let outcome = run_exchange(
            self.provider.as_ref(),
            &self.tools,
            &self.history,
            message,
            &self.limits,
        )
        .await?;

        self.history.extend(outcome.turns);
        self.state.absorb(outcome.candidates);
        Ok(outcome.text.trim().to_string())
    }
}
