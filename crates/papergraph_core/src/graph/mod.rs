//! Whole-corpus graph view.
//!
//! # Responsibility
//! - Define the relational snapshot consumed by the builder and the
//!   node/edge view it produces.
//! - Keep the graph a derived value: it is rebuilt from a snapshot on every
//!   request and never persisted.
//!
//! # Invariants
//! - No two edges share a `(source, target, kind)` triple.
//! - A paper's `backlink_ids` are exactly the notes with a reference edge
//!   into it.

mod builder;

pub use builder::build_graph;

use crate::model::association::{NotePaperRow, NoteTagRow, PaperTagRow};
use crate::model::entity::{Note, Paper};
use crate::model::tag::Tag;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rows read from the store at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub papers: Vec<Paper>,
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
    pub paper_tags: Vec<PaperTagRow>,
    pub note_tags: Vec<NoteTagRow>,
    pub note_papers: Vec<NotePaperRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Tag,
    Paper,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Entity to tag.
    Tag,
    /// Note to the paper it references.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    pub updated_at: i64,
    /// Sorted; empty for tag nodes.
    pub tag_ids: Vec<Uuid>,
    /// Papers referenced by a note; empty for papers and tags.
    pub reference_ids: Vec<Uuid>,
    /// Notes referencing a paper; empty for notes and tags.
    pub backlink_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: Uuid,
    pub target: Uuid,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl Graph {
    pub fn node(&self, id: Uuid) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Edges with `id` as source or target.
    pub fn edges_touching(&self, id: Uuid) -> impl Iterator<Item = &EdgeView> {
        self.edges
            .iter()
            .filter(move |edge| edge.source == id || edge.target == id)
    }
}
