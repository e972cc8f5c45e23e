//! Paper and note records.
//!
//! # Invariants
//! - `name` is never blank; papers always carry a non-blank `source_url`.
//! - Body payloads (`annotations`, `content`) are opaque to the core.
//! - Timestamps are Unix epoch milliseconds assigned by the store.

use crate::error::{CoreError, CoreResult};
use crate::model::tag::TagId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PaperId = Uuid;
pub type NoteId = Uuid;
/// Id of either a paper or a note.
pub type EntityId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Paper,
    Note,
}

impl EntityKind {
    /// The kind on the other side of a paper/note reference.
    pub fn peer(self) -> Self {
        match self {
            Self::Paper => Self::Note,
            Self::Note => Self::Paper,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Note => "note",
        }
    }
}

/// A research paper with its annotation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub name: String,
    pub source_url: String,
    /// Serialized highlight/annotation payload owned by the PDF viewer.
    pub annotations: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A free-form note with its editor payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub name: String,
    /// Serialized rich-text document owned by the editor.
    pub content: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A paper or a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Paper(Paper),
    Note(Note),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Paper(paper) => paper.id,
            Self::Note(note) => note.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Paper(_) => EntityKind::Paper,
            Self::Note(_) => EntityKind::Note,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Paper(paper) => &paper.name,
            Self::Note(note) => &note.name,
        }
    }

    /// Body payload: annotations for papers, content for notes.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Paper(paper) => paper.annotations.as_deref(),
            Self::Note(note) => note.content.as_deref(),
        }
    }

    pub fn updated_at(&self) -> i64 {
        match self {
            Self::Paper(paper) => paper.updated_at,
            Self::Note(note) => note.updated_at,
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            Self::Paper(paper) => paper.created_at,
            Self::Note(note) => note.created_at,
        }
    }

    pub fn as_paper(&self) -> Option<&Paper> {
        match self {
            Self::Paper(paper) => Some(paper),
            Self::Note(_) => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Self::Note(note) => Some(note),
            Self::Paper(_) => None,
        }
    }

    pub fn into_paper(self) -> Option<Paper> {
        match self {
            Self::Paper(paper) => Some(paper),
            Self::Note(_) => None,
        }
    }

    pub fn into_note(self) -> Option<Note> {
        match self {
            Self::Note(note) => Some(note),
            Self::Paper(_) => None,
        }
    }
}

/// Creation request for a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPaper {
    pub name: String,
    pub source_url: String,
    pub annotations: Option<String>,
    /// Tags attached in the same transaction as the insert.
    pub tag_ids: Vec<TagId>,
    /// Notes that reference this paper, linked in the same transaction.
    pub note_ids: Vec<NoteId>,
}

impl NewPaper {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> CoreResult<()> {
        require_text("paper name", &self.name)?;
        require_text("paper source url", &self.source_url)
    }
}

/// Creation request for a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub name: String,
    pub content: Option<String>,
    pub tag_ids: Vec<TagId>,
    /// Papers this note references.
    pub paper_ids: Vec<PaperId>,
}

impl NewNote {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> CoreResult<()> {
        require_text("note name", &self.name)
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, NewNote, NewPaper};

    #[test]
    fn new_paper_requires_name_and_url() {
        assert!(NewPaper::new("Attention", "https://arxiv.org/abs/1706.03762")
            .validate()
            .is_ok());
        assert!(NewPaper::new("  ", "https://example.com").validate().is_err());
        assert!(NewPaper::new("Attention", "").validate().is_err());
    }

    #[test]
    fn new_note_requires_name() {
        assert!(NewNote::new("reading log").validate().is_ok());
        assert!(NewNote::new("\t").validate().is_err());
    }

    #[test]
    fn peer_kind_flips() {
        assert_eq!(EntityKind::Paper.peer(), EntityKind::Note);
        assert_eq!(EntityKind::Note.peer(), EntityKind::Paper);
    }
}
