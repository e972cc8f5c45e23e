//! Paper/note use-case service.
//!
//! # Responsibility
//! - Create papers and notes together with their initial tags and peers.
//! - Read one entity with its tags and peers.
//! - Apply partial updates (fields plus association diffs) atomically.
//! - Delete entities with association cleanup.
//!
//! # Invariants
//! - Each operation is one transaction; a failing association rolls back
//!   the entity insert or field change made before it.
//! - Deleting an entity never deletes tags or the entities on the other
//!   side of its associations.

use crate::db::Store;
use crate::error::CoreResult;
use crate::model::association::{AssociationDiff, AssociationKind};
use crate::model::entity::{Entity, EntityId, EntityKind, NewNote, NewPaper, Note, Paper};
use crate::model::tag::Tag;
use crate::model::update::EntityUpdate;
use crate::repo::association_repo::{LinkTable, SqliteAssociationRepository};
use crate::repo::entity_repo::{ListOrder, SqliteEntityRepository};
use crate::repo::tag_repo::SqliteTagRepository;
use crate::service::association_service::{apply_diff, delete_entity_cascade, resolve_entity_kind};
use log::info;
use serde::{Deserialize, Serialize};

pub const RECENT_DEFAULT_LIMIT: u32 = 5;
pub const RECENT_LIMIT_MAX: u32 = 50;

/// One entity with its tags and peers.
///
/// Peers are the notes referencing a paper, or the papers a note references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub entity: Entity,
    pub tags: Vec<Tag>,
    pub peers: Vec<Entity>,
}

pub struct EntityService<'s> {
    store: &'s Store,
}

impl<'s> EntityService<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Creates a paper and links its initial tags and notes.
    pub fn create_paper(&self, paper: NewPaper) -> CoreResult<Paper> {
        paper.validate()?;
        let tags = AssociationDiff::new(paper.tag_ids.iter().copied(), [])?;
        let notes = AssociationDiff::new(paper.note_ids.iter().copied(), [])?;

        let created = self.store.write(|tx| {
            let created = SqliteEntityRepository::new(tx).insert_paper(&paper)?;
            apply_diff(tx, EntityKind::Paper, created.id, AssociationKind::Tags, &tags)?;
            apply_diff(tx, EntityKind::Paper, created.id, AssociationKind::Peers, &notes)?;
            Ok(created)
        })?;

        info!(
            "event=entity_create module=entity status=ok kind=paper entity_id={} tag_count={} peer_count={}",
            created.id,
            tags.add.len(),
            notes.add.len()
        );
        Ok(created)
    }

    /// Creates a note and links its initial tags and referenced papers.
    pub fn create_note(&self, note: NewNote) -> CoreResult<Note> {
        note.validate()?;
        let tags = AssociationDiff::new(note.tag_ids.iter().copied(), [])?;
        let papers = AssociationDiff::new(note.paper_ids.iter().copied(), [])?;

        let created = self.store.write(|tx| {
            let created = SqliteEntityRepository::new(tx).insert_note(&note)?;
            apply_diff(tx, EntityKind::Note, created.id, AssociationKind::Tags, &tags)?;
            apply_diff(tx, EntityKind::Note, created.id, AssociationKind::Peers, &papers)?;
            Ok(created)
        })?;

        info!(
            "event=entity_create module=entity status=ok kind=note entity_id={} tag_count={} peer_count={}",
            created.id,
            tags.add.len(),
            papers.add.len()
        );
        Ok(created)
    }

    /// Reads one entity with its tags and peers.
    pub fn get_entity(&self, id: EntityId) -> CoreResult<EntityDetail> {
        self.store.read(|tx| {
            let entities = SqliteEntityRepository::new(tx);
            let entity = entities.get(id)?;
            let kind = entity.kind();
            let associations = SqliteAssociationRepository::new(tx);

            let tags = SqliteTagRepository::new(tx)
                .linked_to(LinkTable::for_entity(kind, AssociationKind::Tags), id)?;

            let mut peers = Vec::new();
            let peer_link = LinkTable::for_entity(kind, AssociationKind::Peers);
            for peer_id in associations.targets(peer_link, id)? {
                peers.push(entities.get(peer_id)?);
            }
            sort_recent_first(&mut peers);

            Ok(EntityDetail {
                entity,
                tags,
                peers,
            })
        })
    }

    /// Applies a partial update in one transaction and returns the entity.
    ///
    /// The request is validated before the store is touched; the kind-specific
    /// rule runs once the kind is known and before any row is written.
    /// Association-only updates leave `updated_at` unchanged.
    pub fn update_entity(&self, id: EntityId, update: EntityUpdate) -> CoreResult<Entity> {
        let validated = update.validate()?;
        let (updated, change) = self.store.write(|tx| {
            let kind = resolve_entity_kind(tx, id)?;
            validated.ensure_applies_to(kind)?;

            let entities = SqliteEntityRepository::new(tx);
            if !validated.fields.is_empty() {
                entities.update_fields(kind, id, &validated.fields)?;
            }
            let mut change = apply_diff(tx, kind, id, AssociationKind::Tags, &validated.tags)?;
            change += apply_diff(tx, kind, id, AssociationKind::Peers, &validated.peers)?;
            Ok((entities.get(id)?, change))
        })?;

        info!(
            "event=entity_update module=entity status=ok kind={} entity_id={id} added={} removed={}",
            updated.kind().as_str(),
            change.added,
            change.removed
        );
        Ok(updated)
    }

    /// Deletes an entity and every association row mentioning it.
    ///
    /// # Errors
    /// - `NotFound` when no paper or note has this id.
    pub fn delete_entity(&self, id: EntityId) -> CoreResult<()> {
        let (kind, removed) = self.store.write(|tx| {
            let kind = resolve_entity_kind(tx, id)?;
            let removed = delete_entity_cascade(tx, kind, id)?;
            Ok((kind, removed))
        })?;

        info!(
            "event=entity_delete module=entity status=ok kind={} entity_id={id} associations_removed={removed}",
            kind.as_str()
        );
        Ok(())
    }

    /// All papers, most recently created first.
    pub fn list_papers(&self) -> CoreResult<Vec<Paper>> {
        let entities = self.list(EntityKind::Paper)?;
        Ok(entities
            .into_iter()
            .filter_map(Entity::into_paper)
            .collect())
    }

    /// All notes, most recently created first.
    pub fn list_notes(&self) -> CoreResult<Vec<Note>> {
        let entities = self.list(EntityKind::Note)?;
        Ok(entities
            .into_iter()
            .filter_map(Entity::into_note)
            .collect())
    }

    /// Papers and notes merged, most recently updated first.
    pub fn recent_entities(&self, limit: Option<u32>) -> CoreResult<Vec<Entity>> {
        let limit = normalize_limit(limit, RECENT_DEFAULT_LIMIT, RECENT_LIMIT_MAX) as usize;
        let mut merged = self.store.read(|tx| {
            let repo = SqliteEntityRepository::new(tx);
            let mut merged = repo.list(EntityKind::Paper, ListOrder::UpdatedDesc)?;
            merged.extend(repo.list(EntityKind::Note, ListOrder::UpdatedDesc)?);
            Ok(merged)
        })?;
        sort_recent_first(&mut merged);
        merged.truncate(limit);
        Ok(merged)
    }

    fn list(&self, kind: EntityKind) -> CoreResult<Vec<Entity>> {
        self.store
            .read(|tx| SqliteEntityRepository::new(tx).list(kind, ListOrder::CreatedDesc))
    }
}

/// Orders entities by `updated_at DESC, id ASC`.
pub(crate) fn sort_recent_first(entities: &mut [Entity]) {
    entities.sort_by(|a, b| {
        b.updated_at()
            .cmp(&a.updated_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// Maps `None`/`Some(0)` to `default` and caps at `max`.
pub fn normalize_limit(limit: Option<u32>, default: u32, max: u32) -> u32 {
    match limit {
        Some(0) | None => default,
        Some(value) if value > max => max,
        Some(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_limit;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(normalize_limit(None, 5, 50), 5);
        assert_eq!(normalize_limit(Some(0), 5, 50), 5);
        assert_eq!(normalize_limit(Some(7), 5, 50), 7);
        assert_eq!(normalize_limit(Some(500), 5, 50), 50);
    }
}
