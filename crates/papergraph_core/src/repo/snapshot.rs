//! Snapshot loader for the graph view.

use crate::error::CoreResult;
use crate::graph::GraphSnapshot;
use crate::model::entity::{Entity, EntityKind};
use crate::repo::association_repo::SqliteAssociationRepository;
use crate::repo::entity_repo::{ListOrder, SqliteEntityRepository};
use crate::repo::tag_repo::SqliteTagRepository;
use rusqlite::Connection;

/// Reads every entity, tag and association row through `conn`.
///
/// Run it inside one read transaction to get a consistent snapshot.
pub fn load_snapshot(conn: &Connection) -> CoreResult<GraphSnapshot> {
    let entities = SqliteEntityRepository::new(conn);
    let associations = SqliteAssociationRepository::new(conn);

    let papers = entities
        .list(EntityKind::Paper, ListOrder::CreatedDesc)?
        .into_iter()
        .filter_map(Entity::into_paper)
        .collect();
    let notes = entities
        .list(EntityKind::Note, ListOrder::CreatedDesc)?
        .into_iter()
        .filter_map(Entity::into_note)
        .collect();

    Ok(GraphSnapshot {
        papers,
        notes,
        tags: SqliteTagRepository::new(conn).list()?,
        paper_tags: associations.paper_tag_rows()?,
        note_tags: associations.note_tag_rows()?,
        note_papers: associations.note_paper_rows()?,
    })
}
