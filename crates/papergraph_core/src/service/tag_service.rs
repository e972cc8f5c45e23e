//! Tag use-case service.
//!
//! # Responsibility
//! - Create, rename, delete and list tags.
//! - Create a tag inline while tagging an entity.
//! - Report tag usage and the documents carrying a tag.
//!
//! # Invariants
//! - Tag names are normalized and validated before any store call.
//! - Deleting a tag removes only its association rows; tagged papers and
//!   notes survive untagged.

use crate::db::Store;
use crate::error::CoreResult;
use crate::model::association::{AssociationDiff, AssociationKind};
use crate::model::entity::{Entity, EntityId, EntityKind, Note, Paper};
use crate::model::tag::{normalize_tag_name, Tag, TagId, TagStats};
use crate::repo::entity_repo::SqliteEntityRepository;
use crate::repo::tag_repo::SqliteTagRepository;
use crate::service::association_service::{apply_diff, delete_tag_cascade, resolve_entity_kind};
use log::info;
use serde::{Deserialize, Serialize};

/// A tag with every paper and note carrying it, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDocuments {
    pub tag: Tag,
    pub papers: Vec<Paper>,
    pub notes: Vec<Note>,
}

pub struct TagService<'s> {
    store: &'s Store,
}

impl<'s> TagService<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Creates a standalone tag.
    ///
    /// # Errors
    /// - `Validation` for a blank or over-long name.
    /// - `Conflict` when the exact name is taken; `ml` and `ML` may coexist.
    pub fn create_tag(&self, name: &str) -> CoreResult<Tag> {
        let name = normalize_tag_name(name)?;
        let tag = self
            .store
            .write(|tx| SqliteTagRepository::new(tx).insert(&name))?;
        info!("event=tag_create module=tag status=ok tag_id={}", tag.id);
        Ok(tag)
    }

    /// Creates a tag and attaches it to an existing paper or note in the
    /// same transaction.
    pub fn create_tag_for(&self, name: &str, entity_id: EntityId) -> CoreResult<Tag> {
        let name = normalize_tag_name(name)?;
        let tag = self.store.write(|tx| {
            let kind = resolve_entity_kind(tx, entity_id)?;
            let tag = SqliteTagRepository::new(tx).insert(&name)?;
            let diff = AssociationDiff::new([tag.id], [])?;
            apply_diff(tx, kind, entity_id, AssociationKind::Tags, &diff)?;
            Ok(tag)
        })?;
        info!(
            "event=tag_create module=tag status=ok tag_id={} entity_id={entity_id}",
            tag.id
        );
        Ok(tag)
    }

    pub fn rename_tag(&self, id: TagId, name: &str) -> CoreResult<Tag> {
        let name = normalize_tag_name(name)?;
        let tag = self
            .store
            .write(|tx| SqliteTagRepository::new(tx).rename(id, &name))?;
        info!("event=tag_rename module=tag status=ok tag_id={id}");
        Ok(tag)
    }

    /// Deletes a tag and its paper/note associations.
    pub fn delete_tag(&self, id: TagId) -> CoreResult<()> {
        let removed = self.store.write(|tx| delete_tag_cascade(tx, id))?;
        info!("event=tag_delete module=tag status=ok tag_id={id} associations_removed={removed}");
        Ok(())
    }

    pub fn get_tag(&self, id: TagId) -> CoreResult<Tag> {
        self.store.read(|tx| SqliteTagRepository::new(tx).get(id))
    }

    /// All tags ordered by name.
    pub fn list_tags(&self) -> CoreResult<Vec<Tag>> {
        self.store.read(|tx| SqliteTagRepository::new(tx).list())
    }

    /// Tags whose name contains `keyword`; blank keywords match nothing.
    pub fn search_tags(&self, keyword: &str) -> CoreResult<Vec<Tag>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .read(|tx| SqliteTagRepository::new(tx).search(keyword))
    }

    pub fn tag_stats(&self, id: TagId) -> CoreResult<TagStats> {
        self.store.read(|tx| SqliteTagRepository::new(tx).stats(id))
    }

    pub fn tag_documents(&self, id: TagId) -> CoreResult<TagDocuments> {
        self.store.read(|tx| {
            let tag = SqliteTagRepository::new(tx).get(id)?;
            let entities = SqliteEntityRepository::new(tx);
            let papers = entities
                .tagged_with(EntityKind::Paper, id)?
                .into_iter()
                .filter_map(Entity::into_paper)
                .collect();
            let notes = entities
                .tagged_with(EntityKind::Note, id)?
                .into_iter()
                .filter_map(Entity::into_note)
                .collect();
            Ok(TagDocuments { tag, papers, notes })
        })
    }
}
