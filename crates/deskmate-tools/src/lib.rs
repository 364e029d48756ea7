//! Deskmate tools crate - the callable tools exposed to the language model.
//!
//! Provides the CRM adapter, the staff-directory and organization-history
//! tools that read the knowledge snapshot, and the [`ToolRegistry`] that
//! dispatches model tool calls and reports multi-candidate listings.

pub mod builtin;
pub mod crm;
pub mod directory;
pub mod error;
pub mod knowledge;
pub mod search;
pub mod tool;
pub mod types;

pub use builtin::default_registry;
pub use crm::{CrmApi, CrmClient};
pub use error::ToolError;
pub use knowledge::KnowledgeSnapshot;
pub use tool::{Tool, ToolOutput, ToolRegistry};
pub use types::{Candidate, CandidateList, DirectoryCandidate, EntityCandidate, Responsible};
