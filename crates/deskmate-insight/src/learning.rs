//! Learning analysis over corrected negative feedback.
//!
//! Finds the topics and error categories behind answers users marked as
//! wrong, and turns them into suggestions for whoever maintains the
//! knowledge base and the system instruction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use deskmate_core::text::truncate_chars;
use deskmate_core::types::FeedbackRecord;
use deskmate_storage::{Database, FeedbackQueries};

use crate::error::InsightError;
use crate::tokens::{rank, rank_topics, TopicCount, WordExtractor};

const NO_FEEDBACK_MESSAGE: &str = "Nenhum feedback negativo com correções encontrado";
const TOP_TOPICS: usize = 10;
const TOP_CATEGORIES: usize = 5;
const EXAMPLES_SHOWN: usize = 3;
const EXAMPLE_MAX_CHARS: usize = 100;
/// More corrections than this suggest using them for fine-tuning.
const FINE_TUNING_THRESHOLD: usize = 5;

/// Why an answer was wrong, judged from the answer and its correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    #[serde(rename = "Falta de conhecimento")]
    MissingKnowledge,
    #[serde(rename = "Erro de processamento")]
    ProcessingError,
    #[serde(rename = "Resposta incompleta")]
    IncompleteAnswer,
    #[serde(rename = "Informação de contato incorreta")]
    WrongContact,
    #[serde(rename = "Informação temporal incorreta")]
    WrongDate,
    #[serde(rename = "Informação factual incorreta")]
    WrongFact,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::MissingKnowledge => "Falta de conhecimento",
            ErrorCategory::ProcessingError => "Erro de processamento",
            ErrorCategory::IncompleteAnswer => "Resposta incompleta",
            ErrorCategory::WrongContact => "Informação de contato incorreta",
            ErrorCategory::WrongDate => "Informação temporal incorreta",
            ErrorCategory::WrongFact => "Informação factual incorreta",
        }
    }

    /// First matching rule wins; every pair gets exactly one category.
    pub fn classify(response: &str, correction: &str) -> Self {
        let response_lower = response.to_lowercase();
        let correction_lower = correction.to_lowercase();
        if contains_any(&response_lower, &["não sei", "não encontrei"]) {
            ErrorCategory::MissingKnowledge
        } else if contains_any(&response_lower, &["erro", "desculpe"]) {
            ErrorCategory::ProcessingError
        } else if correction.chars().count() > 2 * response.chars().count() {
            ErrorCategory::IncompleteAnswer
        } else if contains_any(&correction_lower, &["ramal", "telefone", "contato"]) {
            ErrorCategory::WrongContact
        } else if contains_any(&correction_lower, &["prazo", "data", "quando"]) {
            ErrorCategory::WrongDate
        } else {
            ErrorCategory::WrongFact
        }
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: ErrorCategory,
    pub count: u64,
}

/// A wrong answer next to the answer the user expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionExample {
    pub query: String,
    pub wrong_response: String,
    pub correct_response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPatterns {
    pub common_topics: Vec<TopicCount>,
    pub frequent_errors: Vec<CategoryCount>,
    /// The newest few corrections.
    pub correction_examples: Vec<CorrectionExample>,
    /// All corrections in the window.
    pub total_corrections: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningAnalysis {
    pub total_negative_feedback: usize,
    pub patterns: ErrorPatterns,
    pub suggestions: Vec<String>,
    pub period_days: u32,
}

/// Outcome of one learning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LearningReport {
    Empty { message: String },
    Findings(LearningAnalysis),
    Failed { error: String },
}

impl LearningReport {
    pub fn suggestions(&self) -> &[String] {
        match self {
            LearningReport::Findings(analysis) => &analysis.suggestions,
            _ => &[],
        }
    }
}

pub struct LearningAnalyzer {
    queries: FeedbackQueries,
    words: WordExtractor,
}

impl LearningAnalyzer {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            queries: FeedbackQueries::new(db),
            words: WordExtractor::new(),
        }
    }

    /// Analyze corrected negative feedback from the last `days_back` days.
    pub fn analyze_negative_feedback(&self, days_back: u32) -> LearningReport {
        match self.try_analyze(days_back) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Learning analysis failed");
                LearningReport::Failed {
                    error: format!("Erro ao analisar feedback: {e}"),
                }
            }
        }
    }

    fn try_analyze(&self, days_back: u32) -> Result<LearningReport, InsightError> {
        let since = Utc::now() - Duration::days(i64::from(days_back));
        let rows = self.queries.negative_with_corrections_since(since)?;
        debug!(rows = rows.len(), days_back, "Loaded corrected negative feedback");

        if rows.is_empty() {
            return Ok(LearningReport::Empty {
                message: NO_FEEDBACK_MESSAGE.to_string(),
            });
        }

        let patterns = self.identify_patterns(&rows);
        let suggestions = improvement_suggestions(&patterns);
        Ok(LearningReport::Findings(LearningAnalysis {
            total_negative_feedback: rows.len(),
            patterns,
            suggestions,
            period_days: days_back,
        }))
    }

    /// Topics, categories and exemplars of `rows`, which are newest first.
    pub fn identify_patterns(&self, rows: &[FeedbackRecord]) -> ErrorPatterns {
        let mut topics: Vec<String> = Vec::new();
        let mut categories: Vec<ErrorCategory> = Vec::new();

        for row in rows {
            let correction = row.correction.as_deref().unwrap_or_default();
            let query = row.user_query.to_lowercase();
            topics.extend(self.words.words(&query, 3).map(str::to_string));
            categories.push(ErrorCategory::classify(&row.bot_response, correction));
        }

        let mut common_topics = rank_topics(topics);
        common_topics.truncate(TOP_TOPICS);

        let mut frequent_errors: Vec<CategoryCount> = rank(categories)
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        frequent_errors.truncate(TOP_CATEGORIES);

        let correction_examples = rows
            .iter()
            .take(EXAMPLES_SHOWN)
            .map(|row| CorrectionExample {
                query: row.user_query.clone(),
                wrong_response: truncate_chars(&row.bot_response, EXAMPLE_MAX_CHARS),
                correct_response: truncate_chars(
                    row.correction.as_deref().unwrap_or_default(),
                    EXAMPLE_MAX_CHARS,
                ),
                timestamp: row.timestamp,
            })
            .collect();

        ErrorPatterns {
            common_topics,
            frequent_errors,
            correction_examples,
            total_corrections: rows.len(),
        }
    }
}

/// Suggestions for the knowledge-base maintainers.
pub fn improvement_suggestions(patterns: &ErrorPatterns) -> Vec<String> {
    let mut suggestions = Vec::new();

    if let Some(top) = patterns.common_topics.first() {
        suggestions.push(format!(
            "Considere adicionar mais informações sobre '{}' à base de conhecimento, pois aparece em {} feedbacks negativos.",
            top.topic, top.count
        ));
    }

    match patterns.frequent_errors.first().map(|c| c.category) {
        Some(ErrorCategory::MissingKnowledge) => suggestions.push(
            "Muitos erros são por falta de conhecimento. Considere expandir a base de conhecimento ou melhorar a busca de informações relevantes."
                .to_string(),
        ),
        Some(ErrorCategory::WrongContact) => suggestions.push(
            "Há erros frequentes em informações de contato. Verifique e atualize os ramais e informações de contato na base de conhecimento."
                .to_string(),
        ),
        Some(ErrorCategory::WrongDate) => suggestions.push(
            "Erros em informações de prazo/data são frequentes. Considere adicionar mais informações sobre prazos e datas importantes."
                .to_string(),
        ),
        _ => {}
    }

    if patterns.total_corrections > FINE_TUNING_THRESHOLD {
        suggestions.push(format!(
            "Com {} correções disponíveis, considere usar esses dados para fine-tuning do modelo ou atualização do prompt.",
            patterns.total_corrections
        ));
    }

    suggestions
}

/// Addendum for the system instruction built from the error categories and
/// the correction exemplars.
pub fn generate_prompt_improvements(patterns: &ErrorPatterns) -> String {
    let mut lines: Vec<String> = Vec::new();

    for entry in &patterns.frequent_errors {
        match entry.category {
            ErrorCategory::MissingKnowledge => lines.push(
                "- Quando não souber uma informação, seja específico sobre o que não sabe e sugira onde o usuário pode encontrar a informação."
                    .to_string(),
            ),
            ErrorCategory::WrongContact => lines.push(
                "- Sempre verifique cuidadosamente as informações de contato antes de fornecê-las. Se não tiver certeza, peça para o usuário confirmar."
                    .to_string(),
            ),
            _ => {}
        }
    }

    if !patterns.correction_examples.is_empty() {
        lines.push("\nExemplos de respostas corretas baseadas em feedback:".to_string());
        for example in patterns.correction_examples.iter().take(EXAMPLES_SHOWN) {
            lines.push(format!(
                "Pergunta: {}\nResposta correta: {}\n",
                example.query, example.correct_response
            ));
        }
    }

    lines.join("\n")
}
