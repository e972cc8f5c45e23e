//! Association rows and association diffs.
//!
//! # Invariants
//! - Each association table admits at most one row per id pair.
//! - `NotePaperRow` is directed: the note references the paper.
//! - An `AssociationDiff` never lists one id in both `add` and `remove`.

use crate::error::{CoreError, CoreResult};
use crate::model::entity::{NoteId, PaperId};
use crate::model::tag::TagId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Which association of an entity a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Paper-tag or note-tag rows.
    Tags,
    /// Note-paper reference rows, seen from either side.
    Peers,
}

impl AssociationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Peers => "peers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PaperTagRow {
    pub paper_id: PaperId,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NoteTagRow {
    pub note_id: NoteId,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NotePaperRow {
    pub note_id: NoteId,
    pub paper_id: PaperId,
}

/// Add/remove sets for one association of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDiff {
    pub add: BTreeSet<Uuid>,
    pub remove: BTreeSet<Uuid>,
}

impl AssociationDiff {
    /// Builds a diff, deduplicating ids and rejecting overlapping sets.
    pub fn new(
        add: impl IntoIterator<Item = Uuid>,
        remove: impl IntoIterator<Item = Uuid>,
    ) -> CoreResult<Self> {
        let add: BTreeSet<Uuid> = add.into_iter().collect();
        let remove: BTreeSet<Uuid> = remove.into_iter().collect();
        if let Some(id) = add.intersection(&remove).next() {
            return Err(CoreError::Validation(format!(
                "id {id} is listed for both add and remove"
            )));
        }
        Ok(Self { add, remove })
    }

    /// Diff turning `current` into `desired`.
    ///
    /// Ids already present are never re-added, so applying the result does
    /// not churn rows that already match.
    pub fn between(current: &BTreeSet<Uuid>, desired: &BTreeSet<Uuid>) -> Self {
        Self {
            add: desired.difference(current).copied().collect(),
            remove: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Row counts written by one association mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationChange {
    pub added: usize,
    pub removed: usize,
}

impl AssociationChange {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

impl std::ops::AddAssign for AssociationChange {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

#[cfg(test)]
mod tests {
    use super::AssociationDiff;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    #[test]
    fn between_computes_minimal_diff() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let current = BTreeSet::from([a, b]);
        let desired = BTreeSet::from([b, c]);

        let diff = AssociationDiff::between(&current, &desired);
        assert_eq!(diff.add, BTreeSet::from([c]));
        assert_eq!(diff.remove, BTreeSet::from([a]));
        assert!(AssociationDiff::between(&desired, &desired).is_empty());
    }

    #[test]
    fn new_rejects_overlap_and_dedups() {
        let a = Uuid::new_v4();
        assert!(AssociationDiff::new([a], [a]).is_err());

        let diff = AssociationDiff::new([a, a], []).unwrap();
        assert_eq!(diff.add.len(), 1);
    }
}
