//! Relatedness resolver.
//!
//! Two entities are related when their tag sets intersect. There is no
//! scoring beyond that: candidates are ordered by `updated_at DESC, id ASC`
//! and truncated to the limit.
//!
//! # Invariants
//! - Read-only; runs in a single read transaction.
//! - An entity without tags, or an unknown id, has no related content.
//! - The source entity never appears in its own results.

use crate::db::Store;
use crate::error::CoreResult;
use crate::model::association::AssociationKind;
use crate::model::entity::{Entity, EntityId, EntityKind, Note, Paper};
use crate::repo::association_repo::{LinkTable, SqliteAssociationRepository};
use crate::repo::entity_repo::SqliteEntityRepository;
use crate::service::entity_service::normalize_limit;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RELATED_DEFAULT_LIMIT: u32 = 5;
pub const RELATED_LIMIT_MAX: u32 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedContent {
    pub related_papers: Vec<Paper>,
    pub related_notes: Vec<Note>,
}

impl RelatedContent {
    pub fn is_empty(&self) -> bool {
        self.related_papers.is_empty() && self.related_notes.is_empty()
    }

    /// Ids of every related paper and note.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.related_papers
            .iter()
            .map(|paper| paper.id)
            .chain(self.related_notes.iter().map(|note| note.id))
    }
}

pub struct RelatednessResolver<'s> {
    store: &'s Store,
}

impl<'s> RelatednessResolver<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Papers and notes sharing at least one tag with `entity_id`.
    ///
    /// `limit` applies to each list separately; `None` or `Some(0)` means
    /// the default of 5, and values above 50 are capped.
    pub fn related_to(&self, entity_id: EntityId, limit: Option<u32>) -> CoreResult<RelatedContent> {
        let limit = normalize_limit(limit, RELATED_DEFAULT_LIMIT, RELATED_LIMIT_MAX);
        let related = self.store.read(|tx| {
            let entities = SqliteEntityRepository::new(tx);
            let Some(kind) = entities.kind_of(entity_id)? else {
                return Ok(RelatedContent::default());
            };

            let tag_ids: Vec<Uuid> = SqliteAssociationRepository::new(tx)
                .targets(LinkTable::for_entity(kind, AssociationKind::Tags), entity_id)?
                .into_iter()
                .collect();
            if tag_ids.is_empty() {
                return Ok(RelatedContent::default());
            }

            let related_papers = entities
                .sharing_any_tag(EntityKind::Paper, &tag_ids, entity_id, limit)?
                .into_iter()
                .filter_map(Entity::into_paper)
                .collect();
            let related_notes = entities
                .sharing_any_tag(EntityKind::Note, &tag_ids, entity_id, limit)?
                .into_iter()
                .filter_map(Entity::into_note)
                .collect();
            Ok(RelatedContent {
                related_papers,
                related_notes,
            })
        })?;

        debug!(
            "event=related_resolve module=related status=ok entity_id={entity_id} papers={} notes={}",
            related.related_papers.len(),
            related.related_notes.len()
        );
        Ok(related)
    }
}
