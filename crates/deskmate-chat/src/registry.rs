//! Live sessions, one per user.
//!
//! The registry is injected into the API state. Its map lock is held only to
//! look up, insert or remove entries; each session sits behind its own async
//! mutex so requests from the same user run one after the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use deskmate_core::config::ChatConfig;
use deskmate_storage::KnowledgeRepository;
use deskmate_tools::{default_registry, CrmApi, KnowledgeSnapshot};

use crate::error::ChatError;
use crate::exchange::ExchangeLimits;
use crate::provider::ModelProvider;
use crate::session::ConversationSession;

pub type SharedSession = Arc<tokio::sync::Mutex<ConversationSession>>;

/// Builds sessions from the current knowledge base.
pub struct SessionFactory {
    knowledge: KnowledgeRepository,
    provider: Arc<dyn ModelProvider>,
    crm: Arc<dyn CrmApi>,
    limits: ExchangeLimits,
    chat: ChatConfig,
}

impl SessionFactory {
    pub fn new(
        knowledge: KnowledgeRepository,
        provider: Arc<dyn ModelProvider>,
        crm: Arc<dyn CrmApi>,
        limits: ExchangeLimits,
        chat: ChatConfig,
    ) -> Self {
        Self {
            knowledge,
            provider,
            crm,
            limits,
            chat,
        }
    }

    pub fn chat_config(&self) -> &ChatConfig {
        &self.chat
    }

    /// A fresh session over a snapshot loaded now.
    pub fn build(&self, user_id: i64) -> Result<ConversationSession, ChatError> {
        let snapshot = Arc::new(KnowledgeSnapshot::new(self.knowledge.load_all()?));
        let tools = default_registry(snapshot.clone(), self.crm.clone());
        let session = ConversationSession::new(
            user_id,
            snapshot,
            tools,
            self.provider.clone(),
            self.limits,
            &self.chat.assistant_name,
            &self.chat.organization_name,
        );
        info!(
            user_id,
            session_id = %session.session_id(),
            knowledge_keys = session.knowledge().len(),
            "Session created"
        );
        Ok(session)
    }
}

/// Map contents plus a counter bumped on every invalidation.
#[derive(Default)]
struct Live {
    generation: u64,
    sessions: HashMap<i64, SharedSession>,
}

pub struct SessionRegistry {
    factory: SessionFactory,
    live: Mutex<Live>,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            live: Mutex::new(Live::default()),
        }
    }

    fn live(&self) -> MutexGuard<'_, Live> {
        // Entries are plain Arcs; a panic elsewhere cannot leave them torn.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.live().generation
    }

    /// Insert `session` unless an invalidation ran since `generation` was
    /// read. With `replace` an existing entry is overwritten, otherwise it
    /// wins over `session`.
    fn insert_if_current(
        &self,
        user_id: i64,
        generation: u64,
        session: ConversationSession,
        replace: bool,
    ) -> Option<SharedSession> {
        let mut live = self.live();
        if live.generation != generation {
            return None;
        }
        let fresh = Arc::new(tokio::sync::Mutex::new(session));
        if replace {
            live.sessions.insert(user_id, fresh.clone());
            Some(fresh)
        } else {
            Some(live.sessions.entry(user_id).or_insert(fresh).clone())
        }
    }

    /// Build a session and insert it, rebuilding whenever the knowledge
    /// base was invalidated while the snapshot was being loaded.
    ///
    /// Returns the live entry and the id of the session that was built.
    fn build_and_insert(
        &self,
        user_id: i64,
        replace: bool,
    ) -> Result<(SharedSession, Uuid), ChatError> {
        loop {
            let generation = self.generation();
            let session = self.factory.build(user_id)?;
            let session_id = session.session_id();
            if let Some(shared) = self.insert_if_current(user_id, generation, session, replace) {
                return Ok((shared, session_id));
            }
            debug!(user_id, "Knowledge changed during session build; rebuilding");
        }
    }

    /// The user's session, built on first use.
    pub fn get_or_create(&self, user_id: i64) -> Result<SharedSession, ChatError> {
        if let Some(existing) = self.live().sessions.get(&user_id) {
            return Ok(existing.clone());
        }
        self.build_and_insert(user_id, false).map(|(shared, _)| shared)
    }

    /// Replace the user's session with a new one (login).
    pub fn start(&self, user_id: i64) -> Result<Uuid, ChatError> {
        let (_, session_id) = self.build_and_insert(user_id, true)?;
        Ok(session_id)
    }

    /// Drop the user's session (logout). Returns whether one existed.
    pub fn end(&self, user_id: i64) -> bool {
        let removed = self.live().sessions.remove(&user_id).is_some();
        if removed {
            info!(user_id, "Session ended");
        }
        removed
    }

    /// Drop every session so the next request sees fresh knowledge.
    ///
    /// Sessions whose snapshot was loaded before this call are never
    /// inserted afterwards.
    pub fn invalidate_all(&self) -> usize {
        let mut live = self.live();
        let dropped = live.sessions.len();
        live.sessions.clear();
        live.generation += 1;
        info!(dropped, generation = live.generation, "All sessions invalidated");
        dropped
    }

    pub fn len(&self) -> usize {
        self.live().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().sessions.is_empty()
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.live().sessions.contains_key(&user_id)
    }

    /// Validate and answer one message for `user_id`.
    ///
    /// Returns the reply and the id of the session that produced it.
    pub async fn ask(&self, user_id: i64, message: &str) -> Result<(String, Uuid), ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let max = self.factory.chat_config().max_message_length;
        if message.chars().count() > max {
            return Err(ChatError::MessageTooLong(max));
        }

        let shared = self.get_or_create(user_id)?;
        let mut session = shared.lock().await;
        let reply = session.handle_message(message).await;
        Ok((reply, session.session_id()))
    }
}
