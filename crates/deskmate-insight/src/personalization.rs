//! Per-user interest profiles built from shortcuts and well-rated questions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use deskmate_core::text::normalize;
use deskmate_core::types::Shortcut;
use deskmate_storage::{Database, FeedbackQueries, ShortcutRepository};

use crate::error::InsightError;
use crate::tokens::{rank_topics, TopicCount, WordExtractor};

/// Domain words worth tracking, diacritics stripped.
pub const INTEREST_KEYWORDS: [&str; 28] = [
    "ferias",
    "salario",
    "folha",
    "pagamento",
    "rescisao",
    "admissao",
    "nota",
    "fiscal",
    "imposto",
    "icms",
    "ipi",
    "pis",
    "cofins",
    "balanco",
    "contabil",
    "demonstracao",
    "resultado",
    "patrimonio",
    "cliente",
    "fornecedor",
    "ramal",
    "contato",
    "departamento",
    "prazo",
    "vencimento",
    "entrega",
    "documento",
    "certidao",
];

const POSITIVE_QUERIES_SCANNED: u32 = 50;
const TOP_INTERESTS: usize = 10;
const MAX_SUGGESTIONS: usize = 3;
/// Shown when the profile cannot be built.
pub const FALLBACK_SUGGESTION: &str = "Como posso ajudá-lo hoje?";
const GENERIC_SUGGESTIONS: [&str; 3] = [
    FALLBACK_SUGGESTION,
    "Precisa de alguma informação específica?",
    "Tem alguma dúvida sobre processos da empresa?",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestProfile {
    pub user_id: i64,
    pub total_shortcuts: usize,
    /// Positive ratings scanned for the profile, capped at the scan window.
    pub total_positive_feedback: u64,
    pub top_interests: Vec<TopicCount>,
    /// Time of the newest shortcut.
    pub last_activity: Option<DateTime<Utc>>,
}

fn suggestion_for(topic: &str) -> Option<&'static str> {
    match topic {
        "ferias" => Some("Precisa de informações sobre férias?"),
        "fiscal" => Some("Tem dúvidas sobre questões fiscais?"),
        "salario" => Some("Quer saber sobre folha de pagamento?"),
        "cliente" => Some("Precisa consultar dados de algum cliente?"),
        "prazo" => Some("Quer verificar prazos importantes?"),
        _ => None,
    }
}

pub struct PersonalizationAnalyzer {
    shortcuts: ShortcutRepository,
    queries: FeedbackQueries,
    words: WordExtractor,
}

impl PersonalizationAnalyzer {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            shortcuts: ShortcutRepository::new(db.clone()),
            queries: FeedbackQueries::new(db),
            words: WordExtractor::new(),
        }
    }

    pub fn analyze_user_interests(&self, user_id: i64) -> Result<InterestProfile, InsightError> {
        let shortcuts = self.shortcuts.list(user_id)?;
        let positive = self
            .queries
            .recent_positive_queries(user_id, POSITIVE_QUERIES_SCANNED)?;

        let texts = shortcuts
            .iter()
            .map(|s| s.text.as_str())
            .chain(positive.iter().map(String::as_str));
        let mut top_interests = self.extract_interests(texts);
        top_interests.truncate(TOP_INTERESTS);
        debug!(user_id, interests = top_interests.len(), "Interest profile built");

        Ok(InterestProfile {
            user_id,
            total_shortcuts: shortcuts.len(),
            total_positive_feedback: positive.len() as u64,
            top_interests,
            last_activity: self.queries.last_shortcut_at(user_id)?,
        })
    }

    /// Allow-listed words across `texts`, ranked by frequency.
    pub fn extract_interests<'a, I>(&self, texts: I) -> Vec<TopicCount>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found: Vec<String> = Vec::new();
        for text in texts {
            let normalized = normalize(text);
            found.extend(
                self.words
                    .words(&normalized, 3)
                    .filter(|w| INTEREST_KEYWORDS.contains(w))
                    .map(str::to_string),
            );
        }
        rank_topics(found)
    }

    /// Up to three prompts tailored to the user's top interests.
    pub fn generate_personalized_suggestions(&self, user_id: i64) -> Vec<String> {
        let profile = match self.analyze_user_interests(user_id) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to build interest profile");
                return vec![FALLBACK_SUGGESTION.to_string()];
            }
        };

        let mut suggestions: Vec<String> = profile
            .top_interests
            .iter()
            .take(MAX_SUGGESTIONS)
            .filter_map(|interest| suggestion_for(&interest.topic))
            .map(str::to_string)
            .collect();

        if suggestions.is_empty() {
            suggestions = GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        }
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    /// Record an explicit interest as a shortcut.
    pub fn update_user_profile(&self, user_id: i64, interest: &str) -> Result<Shortcut, InsightError> {
        let interest = interest.trim();
        if interest.is_empty() {
            return Err(InsightError::InvalidInput("interest cannot be empty".to_string()));
        }
        Ok(self.shortcuts.add(user_id, &format!("Interesse: {interest}"))?)
    }
}
