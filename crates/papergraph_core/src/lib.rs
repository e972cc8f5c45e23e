//! Relationship graph engine for papers, notes and tags.
//!
//! Papers and notes are linked to each other and to shared tags. The crate
//! persists those links in SQLite, edits them through diff-based mutations,
//! projects them into a node/edge graph and answers "what else shares a
//! tag with this" queries.

pub mod db;
pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use db::Store;
pub use error::{CoreError, CoreResult, ErrorKind, RecordKind};
pub use graph::{build_graph, EdgeKind, EdgeView, Graph, GraphSnapshot, NodeKind, NodeView};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::association::{AssociationChange, AssociationDiff, AssociationKind};
pub use model::entity::{Entity, EntityId, EntityKind, NewNote, NewPaper, Note, NoteId, Paper, PaperId};
pub use model::tag::{normalize_tag_name, Tag, TagId, TagStats};
pub use model::update::EntityUpdate;
pub use search::keyword::search_entities;
pub use service::association_service::AssociationMutator;
pub use service::autosave::{content_autosave, Autosave, Debouncer, AUTOSAVE_DEFAULT_WINDOW};
pub use service::entity_service::{EntityDetail, EntityService};
pub use service::graph_service::GraphService;
pub use service::related_service::{RelatedContent, RelatednessResolver};
pub use service::tag_service::{TagDocuments, TagService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
