use serde::{Deserialize, Serialize};

/// A company returned by a CRM text search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    /// Formatted tax id (CNPJ).
    #[serde(rename = "inscricao")]
    pub tax_id: String,
}

/// A staff member matched in the internal directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCandidate {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "depto")]
    pub department: String,
    #[serde(rename = "ramal")]
    pub extension: String,
}

/// A person responsible for a client account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsible {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cargo")]
    pub position: String,
}

/// Results of one listing tool call. Each list holds a single shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CandidateList {
    Entities(Vec<EntityCandidate>),
    Directory(Vec<DirectoryCandidate>),
}

/// One element picked out of a [`CandidateList`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Candidate {
    Entity(EntityCandidate),
    Directory(DirectoryCandidate),
}

impl CandidateList {
    pub fn len(&self) -> usize {
        match self {
            CandidateList::Entities(items) => items.len(),
            CandidateList::Directory(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// More than one element: the user has to choose.
    pub fn is_ambiguous(&self) -> bool {
        self.len() > 1
    }

    pub fn is_entities(&self) -> bool {
        matches!(self, CandidateList::Entities(_))
    }

    /// Pick the element at a 1-based position.
    pub fn select(&self, position: usize) -> Option<Candidate> {
        let index = position.checked_sub(1)?;
        match self {
            CandidateList::Entities(items) => items.get(index).cloned().map(Candidate::Entity),
            CandidateList::Directory(items) => {
                items.get(index).cloned().map(Candidate::Directory)
            }
        }
    }
}
