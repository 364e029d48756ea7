//! Per-session disambiguation memory.
//!
//! Holds the candidate list the user was last asked to choose from and the
//! company the conversation is currently scoped to. [`DisambiguationState::prepare`]
//! runs before the model is called and either answers locally or returns
//! the message to forward; [`DisambiguationState::absorb`] runs after a
//! successful exchange with the listing the tools reported.

use deskmate_core::text::normalize;
use deskmate_tools::{Candidate, CandidateList};

use crate::response::ResponseKind;

/// Normalized words that mark a message as a fresh query.
pub const KEYWORDS: [&str; 6] = ["empresa", "cliente", "cnpj", "ramal", "historia", "fazer"];

/// What to do with an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Answer without calling the model.
    Reply(String),
    /// Send this text to the model.
    Forward(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisambiguationState {
    /// Listing awaiting a numeric choice. Only ambiguous listings are kept.
    pub pending: Option<CandidateList>,
    /// Company the follow-up questions refer to.
    pub selected_entity_id: Option<i64>,
    /// Last message that started a fresh query.
    pub original_intent: Option<String>,
}

impl DisambiguationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply selection and scoping rules to a raw user message.
    pub fn prepare(&mut self, raw: &str) -> Prepared {
        let trimmed = raw.trim();
        if is_selection(trimmed) {
            if let Some(pending) = &self.pending {
                // Overflowing numbers are out of range like any other.
                let choice = trimmed.parse::<usize>().ok().and_then(|n| pending.select(n));
                return match choice {
                    None => Prepared::Reply(ResponseKind::InvalidSelection.render()),
                    Some(Candidate::Directory(person)) => {
                        self.pending = None;
                        Prepared::Reply(ResponseKind::Extension(person).render())
                    }
                    Some(Candidate::Entity(company)) => {
                        self.pending = None;
                        self.selected_entity_id = Some(company.id);
                        Prepared::Forward(format!(
                            "Continue a pergunta anterior sobre a empresa com ID {}",
                            company.id
                        ))
                    }
                };
            }
        }

        if has_keyword(raw) {
            self.selected_entity_id = None;
            self.original_intent = Some(raw.to_string());
            return Prepared::Forward(raw.to_string());
        }

        match self.selected_entity_id {
            Some(id) => Prepared::Forward(format!("{raw} da empresa com ID {id}")),
            None => Prepared::Forward(raw.to_string()),
        }
    }

    /// Record the outcome of a successful exchange.
    ///
    /// The new listing replaces the pending one. The company scope survives
    /// only while the user is being asked to pick a company.
    pub fn absorb(&mut self, candidates: Option<CandidateList>) {
        let presenting_entities = candidates.as_ref().is_some_and(CandidateList::is_entities);
        self.pending = candidates.filter(CandidateList::is_ambiguous);
        if !presenting_entities {
            self.selected_entity_id = None;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn is_selection(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn has_keyword(text: &str) -> bool {
    let normalized = normalize(text);
    KEYWORDS.iter().any(|k| normalized.contains(k))
}
