//! Deskmate insight crate - batch analysis over stored feedback and shortcuts.
//!
//! Provides:
//! - Learning analysis of corrected negative feedback
//! - Per-user interest profiles and suggestions
//! - The weekly feedback report for administrators

pub mod error;
pub mod learning;
pub mod personalization;
pub mod report;
pub mod tokens;

pub use error::InsightError;
pub use learning::{ErrorCategory, LearningAnalyzer, LearningReport};
pub use personalization::{InterestProfile, PersonalizationAnalyzer};
pub use report::{FeedbackReportGenerator, ReportOutcome, WeeklyReport};
pub use tokens::TopicCount;
