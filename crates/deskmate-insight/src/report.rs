//! Weekly feedback report for administrators.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use deskmate_storage::{Database, FeedbackQueries, RatingCounts, UserActivity};

use crate::error::InsightError;
use crate::learning::{LearningAnalyzer, LearningReport};

const REPORT_DAYS: u32 = 7;
const PERIOD_LABEL: &str = "Últimos 7 dias";
const ACTIVE_USERS_LIMIT: u32 = 5;
const LEARNING_SUGGESTIONS_FORWARDED: usize = 2;
const HIGH_NEGATIVE_RATIO: f64 = 0.3;
const LOW_NEGATIVE_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub positive: u64,
    pub negative: u64,
    pub total: u64,
}

impl From<RatingCounts> for FeedbackStats {
    fn from(counts: RatingCounts) -> Self {
        Self {
            positive: counts.positive,
            negative: counts.negative,
            total: counts.total(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub period: String,
    pub generated_at: DateTime<Utc>,
    pub feedback_stats: FeedbackStats,
    pub learning_analysis: LearningReport,
    pub active_users: Vec<UserActivity>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportOutcome {
    Report(Box<WeeklyReport>),
    Failed { error: String },
}

pub struct FeedbackReportGenerator {
    learning: LearningAnalyzer,
    queries: FeedbackQueries,
}

impl FeedbackReportGenerator {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            learning: LearningAnalyzer::new(db.clone()),
            queries: FeedbackQueries::new(db),
        }
    }

    pub fn generate_weekly_report(&self) -> ReportOutcome {
        match self.try_generate() {
            Ok(report) => {
                info!(
                    total = report.feedback_stats.total,
                    recommendations = report.recommendations.len(),
                    "Weekly report generated"
                );
                ReportOutcome::Report(Box::new(report))
            }
            Err(e) => {
                warn!(error = %e, "Weekly report failed");
                ReportOutcome::Failed {
                    error: format!("Erro ao gerar relatório: {e}"),
                }
            }
        }
    }

    fn try_generate(&self) -> Result<WeeklyReport, InsightError> {
        let learning_analysis = self.learning.analyze_negative_feedback(REPORT_DAYS);

        let since = Utc::now() - Duration::days(i64::from(REPORT_DAYS));
        let counts = self.queries.rating_counts_since(since)?;
        let active_users = self
            .queries
            .most_active_users_since(since, ACTIVE_USERS_LIMIT)?;

        Ok(WeeklyReport {
            period: PERIOD_LABEL.to_string(),
            generated_at: Utc::now(),
            feedback_stats: counts.into(),
            recommendations: recommendations(&learning_analysis, &counts),
            learning_analysis,
            active_users,
        })
    }
}

/// Ratio-based advice followed by the first learning suggestions.
pub fn recommendations(analysis: &LearningReport, counts: &RatingCounts) -> Vec<String> {
    let mut out = Vec::new();

    let total = counts.total();
    if total == 0 {
        out.push(
            "Incentive os usuários a fornecerem mais feedback para melhorar o sistema.".to_string(),
        );
    } else {
        let negative_ratio = counts.negative as f64 / total as f64;
        if negative_ratio > HIGH_NEGATIVE_RATIO {
            out.push(
                "Taxa de feedback negativo alta (>30%). Revise a base de conhecimento.".to_string(),
            );
        } else if negative_ratio < LOW_NEGATIVE_RATIO {
            out.push(
                "Excelente taxa de satisfação! Continue monitorando a qualidade.".to_string(),
            );
        }
    }

    out.extend(
        analysis
            .suggestions()
            .iter()
            .take(LEARNING_SUGGESTIONS_FORWARDED)
            .cloned(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskmate_core::types::{NewFeedback, Rating, Role};
    use deskmate_storage::{FeedbackRepository, UserRepository};

    fn counts(positive: u64, negative: u64) -> RatingCounts {
        RatingCounts { positive, negative }
    }

    fn empty_analysis() -> LearningReport {
        LearningReport::Empty {
            message: "nada".into(),
        }
    }

    // ========================================================================
    // Recommendations
    // ========================================================================

    #[test]
    fn test_no_feedback_encourages_more() {
        let recs = recommendations(&empty_analysis(), &counts(0, 0));
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("Incentive"));
    }

    #[test]
    fn test_ratio_thresholds() {
        let high = recommendations(&empty_analysis(), &counts(6, 4));
        assert!(high[0].contains(">30%"));

        let low = recommendations(&empty_analysis(), &counts(19, 1));
        assert!(low[0].starts_with("Excelente"));

        // Exactly 30% and exactly 10% fall in neither band.
        assert!(recommendations(&empty_analysis(), &counts(7, 3)).is_empty());
        assert!(recommendations(&empty_analysis(), &counts(9, 1)).is_empty());
    }

    #[test]
    fn test_forwards_two_learning_suggestions() {
        let db = Arc::new(Database::in_memory().unwrap());
        let analyzer = LearningAnalyzer::new(db);
        let rows: Vec<_> = (0..6)
            .map(|i| deskmate_core::types::FeedbackRecord {
                id: i,
                user_id: 1,
                user_query: "ramal da Ana".into(),
                bot_response: "O ramal é 211".into(),
                rating: Rating::Unsatisfied,
                correction: Some("ramal 210".into()),
                timestamp: Utc::now(),
            })
            .collect();
        let patterns = analyzer.identify_patterns(&rows);
        let suggestions = crate::learning::improvement_suggestions(&patterns);
        assert_eq!(suggestions.len(), 3);

        let analysis = LearningReport::Findings(crate::learning::LearningAnalysis {
            total_negative_feedback: 6,
            patterns,
            suggestions: suggestions.clone(),
            period_days: 7,
        });
        let recs = recommendations(&analysis, &counts(0, 6));
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1..], suggestions[..2]);
    }

    // ========================================================================
    // Report over storage
    // ========================================================================

    #[test]
    fn test_weekly_report_counts_new_feedback() {
        let db = Arc::new(Database::in_memory().unwrap());
        let users = UserRepository::new(db.clone());
        users.create("ana", Role::User, "t-ana").unwrap();
        users.create("bruno", Role::User, "t-bruno").unwrap();
        let feedback = FeedbackRepository::new(db.clone());
        let generator = FeedbackReportGenerator::new(db);

        let before = match generator.generate_weekly_report() {
            ReportOutcome::Report(report) => report.feedback_stats,
            other => panic!("expected report, got {:?}", other),
        };
        assert_eq!(before.total, 0);

        for (user_id, rating) in [(1, Rating::Satisfied), (1, Rating::Unsatisfied), (2, Rating::Satisfied)] {
            feedback
                .insert(&NewFeedback {
                    user_id,
                    user_query: "qual o ramal da Ana?".into(),
                    bot_response: "210".into(),
                    rating,
                    correction: None,
                })
                .unwrap();
        }

        match generator.generate_weekly_report() {
            ReportOutcome::Report(report) => {
                assert_eq!(report.period, "Últimos 7 dias");
                assert_eq!(
                    report.feedback_stats,
                    FeedbackStats {
                        positive: 2,
                        negative: 1,
                        total: 3
                    }
                );
                assert_eq!(report.active_users[0].username, "ana");
                assert_eq!(report.active_users[0].feedback_count, 2);
                assert!(matches!(report.learning_analysis, LearningReport::Empty { .. }));
                // 1/3 negative is above the 30% band.
                assert!(report.recommendations[0].contains(">30%"));
            }
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_flat() {
        let db = Arc::new(Database::in_memory().unwrap());
        let outcome = FeedbackReportGenerator::new(db).generate_weekly_report();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["period"], "Últimos 7 dias");
        assert_eq!(json["feedback_stats"]["total"], 0);
    }

    #[test]
    fn test_storage_failure_yields_failed_outcome() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE feedback")
                .map_err(|e| deskmate_core::error::DeskmateError::Storage(e.to_string()))
        })
        .unwrap();

        let analyzer = LearningAnalyzer::new(db.clone());
        assert!(matches!(
            analyzer.analyze_negative_feedback(7),
            LearningReport::Failed { .. }
        ));

        let outcome = FeedbackReportGenerator::new(db).generate_weekly_report();
        match &outcome {
            ReportOutcome::Failed { error } => assert!(error.starts_with("Erro ao gerar relatório")),
            other => panic!("expected failure, got {:?}", other),
        }
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["error"].is_string());
    }
}
